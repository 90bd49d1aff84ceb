//! HTTP client for the gallery API plus the optimistic view a UI keeps of
//! the media list.

pub mod cache;
pub mod client;
pub mod error;
pub mod optimistic;

pub use cache::MediaCache;
pub use client::{GalleryClient, UploadFile};
pub use error::ClientError;
pub use optimistic::OptimisticGallery;
