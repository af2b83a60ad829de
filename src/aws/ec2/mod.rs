//! EC2 instance and security-group management

mod instance;
mod operations;
mod security_group;
mod types;

pub use operations::Ec2Operations;
pub use types::LaunchTemplate;

use crate::aws::AwsContext;
use aws_sdk_ec2::Client;

/// EC2 client for managing sandbox instances
pub struct Ec2Client {
    pub(crate) client: Client,
}

impl Ec2Client {
    /// Create an EC2 client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }
}
