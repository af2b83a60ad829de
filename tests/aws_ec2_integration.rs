//! EC2 integration tests - actually call AWS APIs
//!
//! These tests are marked `#[ignore]` and only run with:
//! ```
//! AWS_PROFILE=your_profile cargo test --test aws_ec2_integration -- --ignored
//! ```

use burnbox::aws::{AwsContext, Ec2Client};

fn test_region() -> String {
    std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-2".to_string())
}

#[tokio::test]
#[ignore = "requires AWS credentials"]
async fn security_group_find_or_create_roundtrip() {
    let region = test_region();
    let ctx = AwsContext::new(&region).await;
    let client = Ec2Client::from_context(&ctx);

    let name = format!("burnbox-test-{}", std::process::id());

    assert!(
        client
            .find_security_group(&name)
            .await
            .expect("AWS credentials required - set AWS_PROFILE or AWS_ACCESS_KEY_ID")
            .is_none(),
        "Test group name should not exist yet"
    );

    let created = client
        .create_security_group(&name, "203.0.113.5/32")
        .await
        .expect("Should create security group");
    assert!(
        created.starts_with("sg-"),
        "Group ID should start with 'sg-', got: {}",
        created
    );

    let found = client
        .find_security_group(&name)
        .await
        .expect("Should look up security group");
    assert_eq!(found.as_deref(), Some(created.as_str()));

    // Clean up with the raw client; the service itself never deletes groups
    ctx.ec2_client()
        .delete_security_group()
        .group_id(&created)
        .send()
        .await
        .expect("Failed to clean up test security group");
}
