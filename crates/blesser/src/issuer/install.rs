// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installs an issuer response as the principal's default blessings.

use tracing::{debug, info};

use crate::blessing::Blessings;
use crate::codec;
use crate::issuer::ExchangeError;
use crate::principal::Principal;

/// Decode `body` (base64url CBOR blessings) and make it the default.
///
/// The principal is only touched once decoding has succeeded.
pub fn install(body: &[u8], principal: &dyn Principal) -> Result<Blessings, ExchangeError> {
    let blessings: Blessings = codec::from_base64_cbor(body).map_err(ExchangeError::Decode)?;
    principal.set_default(blessings.clone()).map_err(ExchangeError::Install)?;

    debug!(store = %principal.debug_string(), "blessing store");
    info!(name = %blessings.name(), "default blessings installed");
    Ok(blessings)
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::SigningKey;

    use super::*;
    use crate::principal::KeyPrincipal;
    use crate::test_support::MockPrincipal;

    fn issued_for(principal: &KeyPrincipal) -> anyhow::Result<Blessings> {
        let issuer = SigningKey::from_bytes(&[3; 32]);
        let root = Blessings::self_signed(&issuer, "issuer", vec![])?;
        Ok(root.bless(&issuer, &principal.verifying_key(), "alice", vec![])?)
    }

    #[test]
    fn installs_decoded_blessings() -> anyhow::Result<()> {
        let principal = KeyPrincipal::generate();
        let body = codec::to_base64_cbor(&issued_for(&principal)?)?;

        let installed = install(body.as_bytes(), &principal)?;
        assert_eq!(installed.name(), "issuer:alice");
        assert_eq!(principal.default_blessings(), Some(installed));
        Ok(())
    }

    #[test]
    fn garbage_body_is_a_decode_error() {
        let principal = MockPrincipal::new();
        let err = install(b"<html>oops</html>", &principal).err();
        assert!(matches!(err, Some(ExchangeError::Decode(_))), "got {err:?}");
        assert_eq!(principal.install_count(), 0);
    }

    #[test]
    fn refused_blessings_are_an_install_error() -> anyhow::Result<()> {
        let principal = KeyPrincipal::generate();
        let stranger = KeyPrincipal::generate();
        let body = codec::to_base64_cbor(&issued_for(&stranger)?)?;

        let err = install(body.as_bytes(), &principal).err();
        assert!(matches!(err, Some(ExchangeError::Install(_))), "got {err:?}");
        assert_eq!(err.map(|e| e.code()), Some(crate::error::ErrorCode::Protocol));
        assert!(principal.default_blessings().is_none());
        Ok(())
    }
}
