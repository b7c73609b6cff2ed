//! IngressTemplate operator - renders templated Ingresses per namespace

use std::sync::Arc;

use clap::Parser;
use kube::{Api, Client, CustomResourceExt};

use ingress_template_operator::config::ControllerArgs;
use ingress_template_operator::controller::{self, Context};
use ingress_template_operator::crd::IngressTemplate;
use ingress_template_operator::telemetry::init_tracing;

/// Name of the IngressTemplate CRD object
const CRD_NAME: &str = "ingresstemplates.ingress-template.takumakume.github.io";

/// IngressTemplate operator - keeps one rendered Ingress per IngressTemplate
#[derive(Parser, Debug)]
#[command(name = "ingress-template-operator", version, about, long_about = None)]
struct Cli {
    /// Print the IngressTemplate CRD manifest and exit
    #[arg(long)]
    crd: bool,

    #[command(flatten)]
    controller: ControllerArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&IngressTemplate::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    init_tracing(cli.controller.log_format)?;
    run_controller(cli.controller).await
}

/// Run the IngressTemplate controller until shutdown
async fn run_controller(args: ControllerArgs) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    if args.install_crd {
        ensure_crd_installed(&client).await?;
    }

    let config = args.reconciler_config();
    tracing::info!(
        context_shape = %config.context_shape,
        naming = %config.naming,
        resync_secs = config.resync_interval.as_secs(),
        store_timeout_secs = config.store_timeout.as_secs(),
        "IngressTemplate operator starting"
    );

    let ctx = Arc::new(Context::builder(client.clone()).config(config).build());
    controller::run(client, ctx, &args.controller_settings()).await;

    tracing::info!("IngressTemplate operator shutting down");
    Ok(())
}

/// Install or update the IngressTemplate CRD using server-side apply
async fn ensure_crd_installed(client: &Client) -> anyhow::Result<()> {
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
    use kube::api::{Patch, PatchParams};

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(controller::FIELD_MANAGER).force();

    tracing::info!("Installing IngressTemplate CRD...");
    crds.patch(CRD_NAME, &params, &Patch::Apply(&IngressTemplate::crd()))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to install IngressTemplate CRD: {}", e))?;

    Ok(())
}
