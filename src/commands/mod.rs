pub mod petitions;
pub mod settings;
pub mod validation;
