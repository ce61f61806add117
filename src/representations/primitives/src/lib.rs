mod builtin;
mod c_float;
mod c_integer;
mod integer_sign;

pub use builtin::Builtin;
pub use c_float::CFloat;
pub use c_integer::CInteger;
pub use integer_sign::IntegerSign;
