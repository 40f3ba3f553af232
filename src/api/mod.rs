pub mod gallery;

pub use gallery::render_gallery;
