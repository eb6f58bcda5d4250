pub mod error;
pub mod extract;
pub mod fetcher;
pub mod forms;
pub mod page;
pub mod session;

pub use error::ScanError;
pub use fetcher::{Authenticator, FormSubmitter, PageFetcher};
pub use forms::Form;
pub use page::Page;
pub use session::{Credentials, HttpSession, SessionOptions};
