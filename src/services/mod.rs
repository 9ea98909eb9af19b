pub mod auth;
pub mod books;
pub mod categories;

pub use auth::{AuthService, CookieRefresher};
pub use books::{BooksQuery, BooksService};
pub use categories::CategoriesService;
