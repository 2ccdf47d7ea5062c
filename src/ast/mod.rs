pub mod expression;
pub mod template;
pub mod value;

pub use expression::*;
pub use template::*;
pub use value::*;
