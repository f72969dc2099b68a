use std::fmt;

use starknet::core::types::Felt;
use starknet::signers::{LocalWallet, SigningKey};

use crate::config::NetworkEndpoint;
use crate::error::DeployError;
use crate::felt::parse_felt;

/// Raw private key material as read from the environment.
#[derive(Clone)]
pub struct PrivateKey(String);

impl PrivateKey {
	pub fn new(raw: String) -> Self {
		Self(raw)
	}

	fn expose(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for PrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("PrivateKey(<redacted>)")
	}
}

/// The account that signs every transaction of a run.
///
/// Construction only checks that the address and key are well-formed
/// field elements.  Whether the key actually controls the account is
/// proven by the first accepted transaction.
#[derive(Clone)]
pub struct SigningIdentity {
	address: Felt,
	key: Felt,
	endpoint: NetworkEndpoint,
}

impl SigningIdentity {
	pub fn new(
		address: &str,
		key: &PrivateKey,
		endpoint: NetworkEndpoint,
	) -> Result<Self, DeployError> {
		let address = parse_felt(address)
			.map_err(|e| DeployError::Config(format!("account address: {e}")))?;
		// Never echo the key itself in the error.
		let key = parse_felt(key.expose()).map_err(|_| {
			DeployError::Config("private key is not a valid field element".into())
		})?;
		if key == Felt::ZERO {
			return Err(DeployError::Config("private key must be non-zero".into()));
		}

		Ok(Self {
			address,
			key,
			endpoint,
		})
	}

	pub fn address(&self) -> Felt {
		self.address
	}

	pub fn endpoint(&self) -> &NetworkEndpoint {
		&self.endpoint
	}

	/// A local wallet for signing with this identity's key.
	pub fn wallet(&self) -> LocalWallet {
		LocalWallet::from(SigningKey::from_secret_scalar(self.key))
	}
}

impl fmt::Debug for SigningIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SigningIdentity")
			.field("address", &format_args!("{:#x}", self.address))
			.field("network", &self.endpoint.network)
			.finish_non_exhaustive()
	}
}
