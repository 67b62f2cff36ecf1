// First-boot script for the sandbox instance

const HOME: &str = "/home/ec2-user";
const JUPYTER_CONFIG: &str = "/home/ec2-user/.jupyter/jupyter_notebook_config.py";

/// Shell commands run once as instance user data
///
/// Each command is its own entry and is rendered on its own line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapScript {
    commands: Vec<String>,
}

impl BootstrapScript {
    /// Script that installs the operator's SSH key, a token-protected notebook
    /// server listening on `jupyter_port`, and a 2 GB swapfile
    pub fn for_sandbox(public_key: &str, token: &str, jupyter_port: u16) -> Self {
        let mut commands = Vec::new();

        // SSH access
        commands.push(format!("mkdir -p {HOME}/.ssh"));
        commands.push(format!("echo \"{public_key}\" >> {HOME}/.ssh/authorized_keys"));
        commands.push(format!("chown -R ec2-user:ec2-user {HOME}/.ssh"));
        commands.push(format!("chmod 700 {HOME}/.ssh"));
        commands.push(format!("chmod 600 {HOME}/.ssh/authorized_keys"));

        // OS packages
        commands.push("yum update -y".to_string());
        commands.push("yum upgrade -y".to_string());

        // Notebook server
        commands.push("yum install python3-pip -y".to_string());
        commands.push("sudo -u ec2-user pip3 install jupyter boto3".to_string());
        commands.push(format!("export PATH=$PATH:/usr/local/bin:{HOME}/.local/bin"));
        commands.push(format!(
            "echo \"export PATH=$PATH:/usr/local/bin:{HOME}/.local/bin\" >> {HOME}/.bashrc"
        ));
        commands.push(format!("sudo -u ec2-user mkdir {HOME}/code"));
        commands.push(format!("sudo -u ec2-user touch {HOME}/jupyter.log"));
        commands.push(format!("sudo -u ec2-user mkdir -p {HOME}/.jupyter"));

        for (i, line) in jupyter_config_lines(token, jupyter_port).iter().enumerate() {
            let redirect = if i == 0 { ">" } else { ">>" };
            commands.push(format!("echo \"{line}\" {redirect} {JUPYTER_CONFIG}"));
        }

        commands.push(format!(
            "nohup sudo -u ec2-user {HOME}/.local/bin/jupyter notebook --config={JUPYTER_CONFIG} > {HOME}/jupyter.log 2>&1 &"
        ));

        // 2GB swapfile
        commands.push("dd if=/dev/zero of=/swapfile bs=128M count=16".to_string());
        commands.push("chmod 600 /swapfile".to_string());
        commands.push("mkswap /swapfile".to_string());
        commands.push("swapon /swapfile".to_string());
        commands.push("echo \"/swapfile swap swap defaults 0 0\" >> /etc/fstab".to_string());

        Self { commands }
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Render as a bash script, one command per line
    pub fn render(&self) -> String {
        let mut script = String::from("#!/bin/bash\n");
        for command in &self.commands {
            script.push_str(command);
            script.push('\n');
        }
        script
    }
}

/// Lines of the notebook server config file
fn jupyter_config_lines(token: &str, port: u16) -> Vec<String> {
    vec![
        "from jupyter_server.auth.security import passwd".to_string(),
        "password = passwd('predefined')".to_string(),
        "c = get_config()".to_string(),
        "c.PasswordIdentityProvider.hashed_password = password".to_string(),
        "c.ServerApp.ip = '0.0.0.0'".to_string(),
        "c.ServerApp.allow_origin = '*'".to_string(),
        format!("c.IdentityProvider.token = '{token}'"),
        "c.ServerApp.allow_remote_access = True".to_string(),
        "c.ExtensionApp.open_browser = False".to_string(),
        "c.ServerApp.open_browser = False".to_string(),
        format!("c.ServerApp.port = {port}"),
        format!("c.ServerApp.root_dir = '{HOME}/code'"),
    ]
}
