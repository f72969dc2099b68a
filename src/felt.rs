use starknet::core::types::Felt;

/// Parse a field element written either as `0x`-prefixed hex or as a
/// decimal integer.
pub fn parse_felt(value: &str) -> Result<Felt, String> {
	let value = value.trim();
	if value.is_empty() {
		return Err("empty field element".into());
	}
	let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
		Some(hex) => Felt::from_hex(&format!("0x{hex}")).map_err(|e| e.to_string()),
		None => Felt::from_dec_str(value).map_err(|e| e.to_string()),
	};
	parsed.map_err(|e| format!("invalid field element `{value}`: {e}"))
}

/// Render a field element as `0x`-prefixed lowercase hex.
pub fn to_hex(felt: &Felt) -> String {
	format!("{felt:#x}")
}
