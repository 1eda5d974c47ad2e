pub mod anime;
pub mod image_url;
