use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher as Argon2PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Algorithm;
use argon2::Argon2;
use argon2::Params;
use argon2::Version;

use super::errors::PasswordError;

/// Salted one-way password hashing (Argon2id).
///
/// The cost factor is the Argon2 iteration count. Memory and parallelism
/// stay at the Argon2 defaults.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher with the given iteration count.
    ///
    /// A cost of `0` selects the Argon2 default (`Params::DEFAULT_T_COST`).
    pub fn new(cost: u32) -> Self {
        let cost = if cost == 0 {
            Params::DEFAULT_T_COST
        } else {
            cost
        };
        Self { cost }
    }

    /// Effective iteration count.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password.
    ///
    /// # Returns
    /// PHC string (algorithm, parameters, salt and digest)
    ///
    /// # Errors
    /// * `HashingFailed` - Invalid parameters or algorithm failure
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let params = Params::new(
            Params::DEFAULT_M_COST,
            self.cost,
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Verify a plaintext password against a stored hash.
    ///
    /// Parameters are read from the stored hash, so hashes produced with a
    /// different cost still verify.
    ///
    /// # Errors
    /// * `EmptyInput` - Either argument is empty
    /// * `InvalidHash` - Stored hash is not a PHC string
    /// * `Mismatch` - Password does not correspond to the hash
    pub fn verify(&self, hashed: &str, password: &str) -> Result<(), PasswordError> {
        if hashed.is_empty() || password.is_empty() {
            return Err(PasswordError::EmptyInput);
        }

        let parsed_hash =
            PasswordHash::new(hashed).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| PasswordError::Mismatch)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(0)
    }
}
