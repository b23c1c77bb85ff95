pub(crate) mod discover;
pub(crate) mod health;
