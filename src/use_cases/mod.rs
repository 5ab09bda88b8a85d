// Use cases layer: auth workflows on top of the identity provider port.

pub mod login;
pub mod logout;
pub mod register;
pub mod session;
pub mod translate_error;

#[cfg(test)]
pub(crate) mod test_support;

pub use login::{LoginRequest, LoginResponse, LoginUseCase};
pub use logout::{LogoutResponse, LogoutUseCase};
pub use register::{RegisterRequest, RegisterResponse, RegisterUseCase};
pub use session::SessionResponse;
pub use translate_error::{Translation, translate};
