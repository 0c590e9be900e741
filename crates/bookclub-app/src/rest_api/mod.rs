pub mod author;
pub mod book;
pub mod paging;
pub mod review;

pub use paging::{listing_params, Page, Pager, Paging};
