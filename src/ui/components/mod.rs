mod alert;
mod form;
mod input;
mod key_result;
mod pagination_bar;

pub use alert::{draw_alert, draw_loader, draw_notice};
pub use form::{Field, Form, FormEvent};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use pagination_bar::{PaginationBar, PaginationEvent};
