pub mod image_service;
pub mod user_service;

pub use image_service::{ImageError, ImageRef, ImageService, NewImage, UploadedFile};
pub use user_service::{Registration, UserError, UserRecord, UserService};
