//! EC2 launch parameters

/// Immutable launch parameters shared by every sandbox this process
/// provisions. The security group is resolved per request and passed
/// separately.
#[derive(Debug, Clone)]
pub struct LaunchTemplate {
    /// Machine image identifier (e.g., "ami-0abcdef1234567890")
    pub ami_id: String,
    /// EC2 instance size class (e.g., "t3.micro")
    pub instance_type: String,
    /// Name of the registered key pair to authorize for SSH
    pub key_name: String,
    /// First-boot bootstrap script (plain text; base64-encoded at launch)
    pub user_data: String,
}
