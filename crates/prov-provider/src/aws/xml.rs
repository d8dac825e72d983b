use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Returns the text content of the first element named `tag` found anywhere
/// in the document. EC2's Query API responses are shallow enough that a
/// single-pass scan like this is simpler than building a DOM.
pub fn first_text(body: &str, tag: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut in_tag = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == tag.as_bytes() => in_tag = true,
            Ok(Event::End(e)) if e.name().as_ref() == tag.as_bytes() => in_tag = false,
            Ok(Event::Text(t)) if in_tag => {
                return t.unescape().ok().map(|s| s.into_owned());
            }
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// EC2 error responses look like
/// `<Response><Errors><Error><Code>..</Code><Message>..</Message>`.
pub fn error_message(body: &str) -> Option<String> {
    let code = first_text(body, "Code");
    let message = first_text(body, "Message");
    match (code, message) {
        (Some(code), Some(message)) => Some(format!("{code}: {message}")),
        (None, Some(message)) => Some(message),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_matching_tag() {
        let body = "<CreateVpcResponse><vpc><vpcId>vpc-123</vpcId></vpc></CreateVpcResponse>";
        assert_eq!(first_text(body, "vpcId"), Some("vpc-123".to_string()));
    }

    #[test]
    fn missing_tag_returns_none() {
        let body = "<CreateVpcResponse><vpc></vpc></CreateVpcResponse>";
        assert_eq!(first_text(body, "vpcId"), None);
    }

    #[test]
    fn parses_error_code_and_message() {
        let body = "<Response><Errors><Error><Code>InvalidVpcID.NotFound</Code>\
                     <Message>vpc not found</Message></Error></Errors></Response>";
        assert_eq!(
            error_message(body),
            Some("InvalidVpcID.NotFound: vpc not found".to_string())
        );
    }
}
