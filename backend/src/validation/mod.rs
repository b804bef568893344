//! Validation rules for submitted forms.

pub mod rules;

pub use validator::Validate;
