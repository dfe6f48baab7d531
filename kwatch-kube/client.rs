use kube::{Client, Config};
use std::time::Duration;

/// Possible errors from Kubernetes client construction.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// No in-cluster environment and no usable kubeconfig.
    #[error("cannot infer kubernetes configuration: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    /// Inferred configuration cannot be turned into a client.
    #[error("cannot build kubernetes client: {0}")]
    BuildClient(#[from] kube::Error),
}

/// Builds a client from the pod's service account or the local kubeconfig.\
/// `client_timeout` becomes the read deadline for every request, so it must exceed
/// the server-side watch timeout or streams would be cut short by the client.
pub async fn new_client(client_timeout: Duration) -> Result<Client, ClientError> {
    let mut config = Config::infer().await?;
    config.read_timeout = Some(client_timeout);
    config.connect_timeout = Some(Duration::from_secs(10));

    Ok(Client::try_from(config)?)
}
