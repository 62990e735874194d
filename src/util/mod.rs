pub mod aa;
pub mod cancel;
