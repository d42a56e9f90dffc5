pub use bson::oid::ObjectId;
use serde_json::{
	json,
	Value,
};

/// Key used by the extended-JSON encoding of an object id:
/// `{"$oid": "<24 hex chars>"}`.
pub const OID_KEY: &str = "$oid";

/// Extended-JSON form stored in records.
pub fn oid_value(id: &ObjectId) -> Value {
	json!({ OID_KEY: id.to_hex() })
}

/// Recognizes the extended-JSON form produced by [`oid_value`].
pub fn parse_oid(value: &Value) -> Option<ObjectId> {
	let obj = value.as_object()?;
	if obj.len() != 1 {
		return None;
	}
	ObjectId::parse_str(obj.get(OID_KEY)?.as_str()?).ok()
}

/// Text form of a key value: object ids become their hex string, strings
/// are taken verbatim, numbers are compared by value so `3` and `3.0`
/// share a key.
pub fn key_string(value: &Value) -> Option<String> {
	if let Some(oid) = parse_oid(value) {
		return Some(oid.to_hex());
	}

	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
			(Some(i), _, _) => Some(i.to_string()),
			(None, Some(u), _) => Some(u.to_string()),
			(None, None, Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
				Some((f as i64).to_string())
			}
			_ => Some(n.to_string()),
		},
		Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}
