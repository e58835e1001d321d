pub mod services;

pub use services::{decode_data_uri, discard_image, image_url, read_multipart_image, store_image, ImageError, UploadItem};
