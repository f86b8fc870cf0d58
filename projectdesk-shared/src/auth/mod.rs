/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: access/refresh token issuing and validation
/// - [`middleware`]: bearer-token extraction and principal loading
/// - [`authorization`]: capability policy table and the `authorize` check
///
/// # Example
///
/// ```no_run
/// use projectdesk_shared::auth::password::{hash_password, verify_password};
/// use projectdesk_shared::auth::jwt::{create_token, Claims, TokenType};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let token = create_token(&Claims::new(1, TokenType::Access), "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
