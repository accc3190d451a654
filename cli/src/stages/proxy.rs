//! Reverse proxy configuration stage
//!
//! Renders the nginx site for the application port, installs it as the
//! active site, validates the configuration, then reloads. The ordering is
//! load-bearing: nginx never reloads an unvalidated config.

use async_trait::async_trait;
use tracing::info;

use crate::errors::DeployError;
use crate::pipeline::{DeployContext, Stage, StageId, StageReport};
use crate::remote::{PlannedStep, RemoteCommand};

/// Render the site config; the application port is the only parameter
pub fn site_config(port: u16) -> String {
    format!(
        "server {{\n\
         \x20   listen 80;\n\
         \x20   server_name _;\n\
         \n\
         \x20   location / {{\n\
         \x20       proxy_pass http://127.0.0.1:{port};\n\
         \x20       proxy_set_header Host $host;\n\
         \x20       proxy_set_header X-Real-IP $remote_addr;\n\
         \x20       proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;\n\
         \x20   }}\n\
         }}\n"
    )
}

/// Available-sites path for the app
pub fn site_path(app: &str) -> String {
    format!("/etc/nginx/sites-available/{}.conf", app)
}

/// Enabled-sites path for the app
pub fn enabled_path(app: &str) -> String {
    format!("/etc/nginx/sites-enabled/{}.conf", app)
}

/// Steps after the config file is in place: enable, validate, reload
pub fn activation_plan(app: &str) -> Vec<PlannedStep> {
    vec![
        PlannedStep::required(
            "site enable",
            RemoteCommand::new("ln")
                .arg("-sf")
                .arg(site_path(app))
                .arg(enabled_path(app))
                .privileged(),
        ),
        PlannedStep::tolerated(
            "default site removal",
            RemoteCommand::new("rm")
                .args(["-f", "/etc/nginx/sites-enabled/default"])
                .privileged(),
        ),
        PlannedStep::required(
            "config validation",
            RemoteCommand::new("nginx").arg("-t").privileged(),
        ),
        PlannedStep::required(
            "proxy reload",
            RemoteCommand::new("systemctl").args(["reload", "nginx"]).privileged(),
        ),
    ]
}

pub struct ProxyStage;

#[async_trait]
impl Stage for ProxyStage {
    fn id(&self) -> StageId {
        StageId::Proxy
    }

    async fn run(&self, ctx: &mut DeployContext) -> Result<StageReport, DeployError> {
        let app = ctx.config.app_name();
        let mut report = StageReport::new(self.id());

        info!("Installing nginx site for port {}", ctx.config.app_port);
        let rendered = site_config(ctx.config.app_port);
        ctx.session
            .run_with_stdin(
                &RemoteCommand::new("tee").arg(&site_path(&app)).privileged(),
                rendered.as_bytes(),
            )
            .await
            .map_err(|e| DeployError::ProxyError(e.to_string()))?;

        ctx.session
            .run_plan(&activation_plan(&app), &mut report.warnings)
            .await
            .map_err(|e| DeployError::ProxyError(e.to_string()))?;

        Ok(report.with_detail(format!("proxying port 80 to {}", ctx.config.app_port)))
    }
}
