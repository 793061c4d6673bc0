use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::{Name, RecordType};

use crate::error::QueryError;

/// DNS response information extracted from a parsed message
#[derive(Debug)]
pub struct DnsResponse {
	pub rcode: ResponseCode,
	/// Number of A records in the answer section
	pub a_records: usize,
}

impl DnsResponse {
	/// An attempt succeeds only on NOERROR with at least one A record.
	pub fn check(&self) -> Result<(), QueryError> {
		if self.rcode != ResponseCode::NoError {
			return Err(QueryError::Rcode(self.rcode.to_string()));
		}
		if self.a_records == 0 {
			return Err(QueryError::EmptyAnswer);
		}
		Ok(())
	}
}

/// Build an A query for `domain` with recursion desired.
///
/// Returns the serialized query bytes ready to send over UDP, or to be
/// length-prefixed for a stream transport.
pub fn build_query(domain: &str, txid: u16) -> Result<Vec<u8>, QueryError> {
	let name = Name::from_ascii(domain)
		.map_err(|e| QueryError::Malformed(format!("invalid domain name '{}': {}", domain, e)))?;

	let mut message = Message::new();
	message.set_id(txid);
	message.set_recursion_desired(true);
	message.add_query(Query::query(name, RecordType::A));

	message.to_vec()
		.map_err(|e| QueryError::Malformed(format!("failed to serialize DNS query: {}", e)))
}

/// Parse a DNS response, validating the transaction ID.
pub fn parse_response(bytes: &[u8], expected_txid: u16) -> Result<DnsResponse, QueryError> {
	let message = Message::from_vec(bytes)
		.map_err(|e| QueryError::Malformed(format!("failed to parse DNS response: {}", e)))?;

	if message.id() != expected_txid {
		return Err(QueryError::Malformed(format!(
			"txid mismatch: expected {}, got {}",
			expected_txid, message.id()
		)));
	}

	if message.message_type() != MessageType::Response {
		return Err(QueryError::Malformed("received a query instead of a response".to_string()));
	}

	let a_records = message.answers().iter()
		.filter(|r| r.record_type() == RecordType::A)
		.count();

	Ok(DnsResponse {
		rcode: message.response_code(),
		a_records,
	})
}

/// Turn a query into a response carrying the given A record, or an empty
/// answer with `rcode` when `addr` is None.
#[cfg(test)]
pub fn fake_response(
	query_bytes: &[u8],
	rcode: ResponseCode,
	addr: Option<std::net::Ipv4Addr>,
) -> Vec<u8> {
	use hickory_proto::rr::{rdata::A, RData, Record};

	let mut message = Message::from_vec(query_bytes).unwrap();
	message.set_message_type(MessageType::Response);
	message.set_response_code(rcode);
	if let Some(ip) = addr {
		let name = message.queries()[0].name().clone();
		message.add_answer(Record::from_rdata(name, 60, RData::A(A(ip))));
	}
	message.to_vec().unwrap()
}
