// Reply Inspector
//
// Decides whether a relayed reply proves that a name exists. The RCODE alone
// is not enough: some resolvers answer NOERROR for names that do not exist.

use crate::dns::record::{canonical_name, is_supported};
use crate::utils::domain_name;
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RecordType;

/// Name worth learning from `reply`, if any.
///
/// The reply must be NOERROR with exactly one question and exactly one
/// answer of a tracked type. PTR answers never qualify, and neither do
/// chains such as CNAME followed by A.
pub fn informative_name(reply: &Message) -> Option<String> {
    if reply.response_code() != ResponseCode::NoError {
        return None;
    }

    let [question] = reply.queries() else {
        return None;
    };

    let [answer] = reply.answers() else {
        return None;
    };
    if answer.record_type() == RecordType::PTR || !is_supported(answer.record_type()) {
        return None;
    }

    let name = domain_name::clean(&canonical_name(question.name()));
    domain_name::is_valid_hostname(&name).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::{MessageType, Query};
    use hickory_proto::rr::rdata::{A, CNAME, PTR};
    use hickory_proto::rr::{Name, RData, Record};
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn reply(qname: &str, qtype: RecordType, answer: Option<RData>) -> Message {
        let name = Name::from_str(qname).unwrap();
        let mut message = Message::new();
        message
            .set_message_type(MessageType::Response)
            .set_response_code(ResponseCode::NoError)
            .add_query(Query::query(name.clone(), qtype));
        if let Some(rdata) = answer {
            message.add_answer(Record::from_rdata(name, 300, rdata));
        }
        message
    }

    #[test]
    fn test_a_answer_is_informative() {
        let message = reply(
            "WWW.Example.com.",
            RecordType::A,
            Some(RData::A(A(Ipv4Addr::new(192, 0, 2, 1)))),
        );
        assert_eq!(informative_name(&message), Some("www.example.com".to_string()));
    }

    #[test]
    fn test_empty_answer_is_not_informative() {
        let message = reply("www.example.com.", RecordType::A, None);
        assert_eq!(informative_name(&message), None);
    }

    #[test]
    fn test_nxdomain_is_not_informative() {
        let mut message = reply(
            "www.example.com.",
            RecordType::A,
            Some(RData::A(A(Ipv4Addr::new(192, 0, 2, 1)))),
        );
        message.set_response_code(ResponseCode::NXDomain);
        assert_eq!(informative_name(&message), None);
    }

    #[test]
    fn test_ptr_is_not_informative() {
        let target = Name::from_str("host.example.com.").unwrap();
        let message = reply(
            "1.2.0.192.in-addr.arpa.",
            RecordType::PTR,
            Some(RData::PTR(PTR(target))),
        );
        assert_eq!(informative_name(&message), None);
    }

    #[test]
    fn test_two_questions_are_not_informative() {
        let mut message = reply(
            "www.example.com.",
            RecordType::A,
            Some(RData::A(A(Ipv4Addr::new(192, 0, 2, 1)))),
        );
        message.add_query(Query::query(
            Name::from_str("mail.example.com.").unwrap(),
            RecordType::A,
        ));
        assert_eq!(informative_name(&message), None);
    }

    #[test]
    fn test_answer_chain_is_not_informative() {
        let mut message = reply(
            "www.example.com.",
            RecordType::A,
            Some(RData::CNAME(CNAME(
                Name::from_str("edge.example.net.").unwrap(),
            ))),
        );
        message.add_answer(Record::from_rdata(
            Name::from_str("edge.example.net.").unwrap(),
            300,
            RData::A(A(Ipv4Addr::new(192, 0, 2, 1))),
        ));
        assert_eq!(message.answers().len(), 2);
        assert_eq!(informative_name(&message), None);
    }
}
