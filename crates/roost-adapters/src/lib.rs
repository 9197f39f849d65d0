pub mod html;
pub mod rest;

pub use html::{HtmlAdapter, HtmlSelectors};
pub use rest::RestAdapter;
