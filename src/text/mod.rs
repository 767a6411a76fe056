pub mod layout;
pub mod shaper;
