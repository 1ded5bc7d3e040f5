pub mod hashtag;
pub mod identity;
pub mod model;
pub mod nutrition;
pub mod pagination;
pub mod provisional;
pub mod story;
