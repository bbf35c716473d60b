use quick_xml::escape::escape;

use super::ValidationOutcome;
use super::xml::{self, Element};
use crate::types::{AttributeValue, Attributes};

/// SOAP request body for `/samlValidate`, carrying the ticket as the
/// assertion artifact.
#[must_use]
pub fn request_envelope(ticket: &str, request_id: &str, issue_instant: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Header/>
  <SOAP-ENV:Body>
    <samlp:Request xmlns:samlp="urn:oasis:names:tc:SAML:1.0:protocol" MajorVersion="1" MinorVersion="1" RequestID="{request_id}" IssueInstant="{issue_instant}">
      <samlp:AssertionArtifact>{ticket}</samlp:AssertionArtifact>
    </samlp:Request>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>
"#,
        request_id = escape(request_id),
        issue_instant = escape(issue_instant),
        ticket = escape(ticket),
    )
}

/// Parse a SAML 1.1 `/samlValidate` SOAP response.
#[must_use]
pub fn parse(body: &str) -> ValidationOutcome {
    let root = match xml::parse(body) {
        Ok(root) => root,
        Err(e) => {
            tracing::debug!(error = %e, "SAML response is not well-formed XML");
            return ValidationOutcome::malformed();
        }
    };

    extract(&root).unwrap_or_else(|missing| {
        tracing::debug!(missing, "SAML response is missing a required node");
        ValidationOutcome::malformed()
    })
}

fn extract(root: &Element) -> Result<ValidationOutcome, &'static str> {
    if !root.is("Envelope") {
        return Err("Envelope");
    }
    let response = root
        .descend(&["Body", "Response"])
        .ok_or("Envelope/Body/Response")?;

    let status = response
        .descend(&["Status", "StatusCode"])
        .and_then(|code| code.attribute("Value"))
        .ok_or("Status/StatusCode@Value")?;

    // `samlp:Success` -> `Success`
    let token = status.split(':').nth(1).unwrap_or(status);
    if token != "Success" {
        return Ok(ValidationOutcome::rejected(Some(token.to_owned())));
    }

    let assertion = response.child("Assertion").ok_or("Assertion")?;
    let principal = assertion
        .descend(&["AuthenticationStatement", "Subject", "NameIdentifier"])
        .map(Element::text)
        .filter(|name| !name.is_empty())
        .ok_or("AuthenticationStatement/Subject/NameIdentifier")?;

    let mut attributes = Attributes::new();
    if let Some(statement) = assertion.child("AttributeStatement") {
        for attribute in statement.children_named("Attribute") {
            let name = attribute
                .attribute("AttributeName")
                .ok_or("Attribute@AttributeName")?;
            let mut values = attribute
                .children_named("AttributeValue")
                .map(|v| v.text().to_owned());
            let first = values.next().ok_or("Attribute/AttributeValue")?;
            let mut value = AttributeValue::Single(first);
            for more in values {
                value.push(more);
            }
            attributes.insert(name.to_owned(), value);
        }
    }

    Ok(ValidationOutcome::success(principal, attributes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::FailureReason;

    fn response(status: &str, assertion: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Header/>
  <SOAP-ENV:Body>
    <saml1p:Response xmlns:saml1p="urn:oasis:names:tc:SAML:1.0:protocol" IssueInstant="2024-01-01T00:00:00Z" MajorVersion="1" MinorVersion="1" ResponseID="_r1">
      <saml1p:Status><saml1p:StatusCode Value="{status}"/></saml1p:Status>
      {assertion}
    </saml1p:Response>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#
        )
    }

    const ASSERTION: &str = r#"
      <saml1:Assertion xmlns:saml1="urn:oasis:names:tc:SAML:1.0:assertion" AssertionID="_a1" MajorVersion="1" MinorVersion="1">
        <saml1:AttributeStatement>
          <saml1:Subject><saml1:NameIdentifier>carol</saml1:NameIdentifier></saml1:Subject>
          <saml1:Attribute AttributeName="email" AttributeNamespace="http://www.ja-sig.org/products/cas/">
            <saml1:AttributeValue>carol@example.com</saml1:AttributeValue>
            <saml1:AttributeValue>c.smith@example.com</saml1:AttributeValue>
          </saml1:Attribute>
          <saml1:Attribute AttributeName="displayName" AttributeNamespace="http://www.ja-sig.org/products/cas/">
            <saml1:AttributeValue>Carol Smith</saml1:AttributeValue>
          </saml1:Attribute>
        </saml1:AttributeStatement>
        <saml1:AuthenticationStatement AuthenticationInstant="2024-01-01T00:00:00Z" AuthenticationMethod="urn:oasis:names:tc:SAML:1.0:am:password">
          <saml1:Subject><saml1:NameIdentifier>carol</saml1:NameIdentifier></saml1:Subject>
        </saml1:AuthenticationStatement>
      </saml1:Assertion>"#;

    #[test]
    fn test_success_with_multi_valued_attribute() {
        let outcome = parse(&response("samlp:Success", ASSERTION));

        let ValidationOutcome::Success {
            principal,
            attributes,
        } = outcome
        else {
            panic!("expected success, got {outcome:?}");
        };

        assert_eq!(principal.as_str(), "carol");
        assert_eq!(
            attributes["email"],
            AttributeValue::Multiple(vec![
                "carol@example.com".into(),
                "c.smith@example.com".into()
            ])
        );
        assert_eq!(attributes["displayName"], AttributeValue::from("Carol Smith"));
    }

    #[test]
    fn test_success_without_attribute_statement() {
        let assertion = r#"<Assertion><AuthenticationStatement><Subject>
            <NameIdentifier>dave</NameIdentifier></Subject></AuthenticationStatement></Assertion>"#;
        assert_eq!(
            parse(&response("samlp:Success", assertion)),
            ValidationOutcome::success("dave", Attributes::new())
        );
    }

    #[test]
    fn test_non_success_status_is_rejected_with_token() {
        assert_eq!(
            parse(&response("samlp:RequestDenied", "")),
            ValidationOutcome::Failure(FailureReason::RemoteRejected {
                code: Some("RequestDenied".into())
            })
        );
    }

    #[test]
    fn test_status_without_prefix_uses_whole_value() {
        assert!(parse(&response("Success", ASSERTION)).is_success());
        assert_eq!(
            parse(&response("Responder", "")),
            ValidationOutcome::rejected(Some("Responder".into()))
        );
    }

    #[test]
    fn test_missing_nodes_are_malformed() {
        let malformed = ValidationOutcome::Failure(FailureReason::MalformedResponse);

        // success status but no assertion
        assert_eq!(parse(&response("samlp:Success", "")), malformed);
        // attribute without a name
        let nameless = r#"<Assertion>
            <AttributeStatement><Attribute><AttributeValue>x</AttributeValue></Attribute></AttributeStatement>
            <AuthenticationStatement><Subject><NameIdentifier>x</NameIdentifier></Subject></AuthenticationStatement>
        </Assertion>"#;
        assert_eq!(parse(&response("samlp:Success", nameless)), malformed);
        // not a SOAP envelope
        assert_eq!(parse("<Response/>"), malformed);
        assert_eq!(parse(""), malformed);
    }

    #[test]
    fn test_envelope_carries_escaped_ticket() {
        let body = request_envelope("ST-1<&>", "_abc", "2024-01-01T00:00:00Z");
        assert!(body.contains("<samlp:AssertionArtifact>ST-1&lt;&amp;&gt;</samlp:AssertionArtifact>"));
        assert!(body.contains(r#"RequestID="_abc""#));
        assert!(body.contains(r#"IssueInstant="2024-01-01T00:00:00Z""#));
        assert!(body.contains(r#"MajorVersion="1" MinorVersion="1""#));

        // The envelope is itself well-formed.
        let root = xml::parse(&body).unwrap();
        let artifact = root
            .descend(&["Body", "Request", "AssertionArtifact"])
            .unwrap();
        assert_eq!(artifact.text(), "ST-1<&>");
    }
}
