pub mod card;
pub mod raster;
pub mod thumbs;
