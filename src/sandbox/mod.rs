pub mod bootstrap;
pub mod operator;

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Attribute, Cell, Table};
use std::net::Ipv4Addr;

use crate::stack_outputs::{BUCKET_NAME, INSTANCE_PUBLIC_IP, JUPYTER_URL};
use bootstrap::BootstrapScript;

/// Name of the deployed sandbox stack
pub const STACK_NAME: &str = "Playground1Stack";

/// Ports reachable from the operator's public IP (SSH and the notebook server)
pub const ALLOWED_PORTS: [u16; 2] = [22, 3000];

/// Port the notebook server listens on
pub const JUPYTER_PORT: u16 = 3000;

pub const INSTANCE_TYPE: &str = "t2.micro";

/// Amazon Linux 2023 image per region
const AMI_MAP: &[(&str, &str)] = &[("us-east-1", "ami-012967cc5a8c9f891")];

/// Actions the instance role may perform on the sandbox bucket
pub const S3_ACTIONS: &[&str] = &[
    "s3:GetObject",
    "s3:ListBucket",
    "s3:PutObject",
    "s3:DeleteObject",
];

/// Actions the instance role may perform on the sandbox table
pub const DYNAMODB_ACTIONS: &[&str] = &[
    "dynamodb:PutItem",
    "dynamodb:GetItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:Query",
    "dynamodb:Scan",
];

/// Actions the instance role may perform on its own stack
pub const CLOUDFORMATION_ACTIONS: &[&str] = &["cloudformation:DescribeStacks"];

/// Look up the machine image for a region
pub fn ami_for_region(region: &str) -> Option<&'static str> {
    AMI_MAP
        .iter()
        .find(|(r, _)| *r == region)
        .map(|(_, ami)| *ami)
}

/// URL of the notebook server on a given host
pub fn jupyter_url(host: &str, token: &str) -> String {
    format!("http://{}:{}/?token={}", host, JUPYTER_PORT, token)
}

/// A TCP ingress rule of the sandbox security group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub cidr: String,
    pub port: u16,
    pub description: String,
}

/// One rule per allowed port, restricted to the operator's address
pub fn ingress_rules(public_ip: Ipv4Addr) -> Vec<IngressRule> {
    ALLOWED_PORTS
        .iter()
        .map(|port| IngressRule {
            cidr: format!("{}/32", public_ip),
            port: *port,
            description: format!("Allow access to port {} from current public IP", port),
        })
        .collect()
}

/// Operator-specific inputs of the sandbox declaration
#[derive(Debug, Clone)]
pub struct SandboxPlan {
    pub stack_name: String,
    pub region: String,
    pub public_ip: Ipv4Addr,
    pub public_key: String,
    pub token: String,
}

impl SandboxPlan {
    pub fn ingress_rules(&self) -> Vec<IngressRule> {
        ingress_rules(self.public_ip)
    }

    pub fn bootstrap_script(&self) -> BootstrapScript {
        BootstrapScript::for_sandbox(&self.public_key, &self.token, JUPYTER_PORT)
    }

    /// Outputs the deployed stack exposes, with placeholders for values known only after deploy
    pub fn expected_outputs(&self) -> Vec<(&'static str, String)> {
        vec![
            (INSTANCE_PUBLIC_IP, "<instance public IP>".to_string()),
            (JUPYTER_URL, jupyter_url("<instance public IP>", &self.token)),
            (BUCKET_NAME, "<generated bucket name>".to_string()),
        ]
    }

    /// Render the plan as tables followed by the bootstrap script
    pub fn render(&self) -> String {
        let mut overview = Table::new();
        overview
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("SETTING").add_attribute(Attribute::Bold),
                Cell::new("VALUE").add_attribute(Attribute::Bold),
            ]);
        overview.add_row(vec![Cell::new("Stack"), Cell::new(&self.stack_name)]);
        overview.add_row(vec![Cell::new("Region"), Cell::new(&self.region)]);
        overview.add_row(vec![Cell::new("Instance type"), Cell::new(INSTANCE_TYPE)]);
        overview.add_row(vec![
            Cell::new("Machine image"),
            Cell::new(ami_for_region(&self.region).unwrap_or("<no image for region>")),
        ]);
        overview.add_row(vec![Cell::new("Operator IP"), Cell::new(self.public_ip)]);

        let mut ingress = Table::new();
        ingress
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("PORT").add_attribute(Attribute::Bold),
                Cell::new("SOURCE").add_attribute(Attribute::Bold),
                Cell::new("DESCRIPTION").add_attribute(Attribute::Bold),
            ]);
        for rule in self.ingress_rules() {
            ingress.add_row(vec![
                Cell::new(rule.port),
                Cell::new(&rule.cidr),
                Cell::new(&rule.description),
            ]);
        }

        let mut permissions = Table::new();
        permissions
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("RESOURCE").add_attribute(Attribute::Bold),
                Cell::new("ACTIONS").add_attribute(Attribute::Bold),
            ]);
        permissions.add_row(vec![
            Cell::new("Bucket and its objects"),
            Cell::new(S3_ACTIONS.join("\n")),
        ]);
        permissions.add_row(vec![
            Cell::new("Table"),
            Cell::new(DYNAMODB_ACTIONS.join("\n")),
        ]);
        permissions.add_row(vec![
            Cell::new(format!("Stack {}", self.stack_name)),
            Cell::new(CLOUDFORMATION_ACTIONS.join("\n")),
        ]);

        let mut outputs = Table::new();
        outputs
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("OUTPUT").add_attribute(Attribute::Bold),
                Cell::new("VALUE").add_attribute(Attribute::Bold),
            ]);
        for (key, value) in self.expected_outputs() {
            outputs.add_row(vec![Cell::new(key), Cell::new(value)]);
        }

        format!(
            "{}\n\nIngress rules:\n{}\n\nInstance role permissions:\n{}\n\nStack outputs:\n{}\n\nBootstrap script:\n{}",
            overview,
            ingress,
            permissions,
            outputs,
            self.bootstrap_script().render()
        )
    }
}
