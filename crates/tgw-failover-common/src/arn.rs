//! ARN helpers.
//!
//! Transit gateway events carry full ARNs
//! (`arn:aws:ec2:eu-west-1:111122223333:transit-gateway/tgw-0123...`);
//! the AWS APIs want the bare resource id after the last `/`.

use crate::error::{FailoverError, FailoverResult};

/// Extracts the resource id from an ARN.
///
/// Returns an error for ARNs without a `/`-delimited resource part.
pub fn resource_id(arn: &str) -> FailoverResult<&str> {
    match arn.rsplit_once('/') {
        Some((_, id)) if !id.is_empty() => Ok(id),
        _ => Err(FailoverError::invalid_event(format!(
            "ARN '{arn}' has no resource id"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id() {
        let arn = "arn:aws:ec2:eu-west-1:111122223333:transit-gateway/tgw-0123456789abcdef0";
        assert_eq!(resource_id(arn).unwrap(), "tgw-0123456789abcdef0");

        let arn = "arn:aws:ec2:eu-west-1:111122223333:vpn-connection/vpn-aaaabbbb";
        assert_eq!(resource_id(arn).unwrap(), "vpn-aaaabbbb");
    }

    #[test]
    fn test_resource_id_rejects_bare_strings() {
        assert!(resource_id("tgw-0123456789abcdef0").is_err());
        assert!(resource_id("arn:aws:ec2:eu-west-1:111122223333:transit-gateway/").is_err());
    }
}
