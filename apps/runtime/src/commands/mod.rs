pub mod announcements;
pub mod images;
pub mod seniors;
pub mod sync;
