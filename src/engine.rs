use crate::app::LogRequest;
use crate::logs::{self, StreamKind};
use crate::model::{Container, ContainerStats, Image, Network, PROJECT_LABEL, PortMapping, Volume};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    InspectContainerOptions, ListContainersOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, RestartContainerOptions, Stats, StatsOptions, StopContainerOptions,
};
use bollard::image::{ListImagesOptions, RemoveImageOptions};
use bollard::network::ListNetworksOptions;
use bollard::volume::{ListVolumesOptions, RemoveVolumeOptions};
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap};
use std::process::Stdio;
use tokio::process::Command as TokioCommand;
use tracing::debug;

const SHORT_ID_LEN: usize = 12;
const STOP_TIMEOUT_SECS: i64 = 10;
const SHELL_CANDIDATES: [&str; 3] = ["/bin/bash", "/bin/sh", "/bin/ash"];
const FALLBACK_SHELL: &str = "/bin/sh";

/// Container engine operations the session needs. The scheduler only talks to
/// this trait so tests can substitute an in-memory engine.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn list_containers(&self) -> Result<Vec<Container>>;
    async fn list_volumes(&self) -> Result<Vec<Volume>>;
    async fn list_images(&self) -> Result<Vec<Image>>;
    async fn list_networks(&self) -> Result<Vec<Network>>;
    async fn start(&self, id: &str) -> Result<()>;
    async fn stop(&self, id: &str) -> Result<()>;
    async fn restart(&self, id: &str) -> Result<()>;
    async fn remove_container(&self, id: &str) -> Result<()>;
    async fn remove_volume(&self, name: &str) -> Result<()>;
    async fn remove_image(&self, id: &str) -> Result<()>;
    /// Raw multiplexed log bytes (8-byte header frames).
    async fn fetch_logs(&self, id: &str, request: LogRequest) -> Result<Vec<u8>>;
    /// Pretty-printed inspect document.
    async fn inspect(&self, id: &str) -> Result<String>;
    async fn stats(&self, id: &str) -> Result<ContainerStats>;
}

#[derive(Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connects with the local defaults and pings the daemon so an
    /// unreachable engine is reported before the terminal is taken over.
    pub async fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .context("failed to create docker client")?;
        docker
            .ping()
            .await
            .context("failed to reach docker daemon")?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl Engine for DockerEngine {
    async fn list_containers(&self) -> Result<Vec<Container>> {
        let summaries = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                ..Default::default()
            }))
            .await
            .context("failed to list containers")?;

        let mut containers = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let full_id = summary.id.unwrap_or_default();
            let env = match self
                .docker
                .inspect_container(&full_id, None::<InspectContainerOptions>)
                .await
            {
                Ok(detail) => detail
                    .config
                    .and_then(|config| config.env)
                    .unwrap_or_default(),
                Err(error) => {
                    debug!("inspect for env of {full_id} failed: {error}");
                    Vec::new()
                }
            };
            let labels = summary.labels.unwrap_or_default();
            let ports = summary
                .ports
                .unwrap_or_default()
                .into_iter()
                .map(|port| PortMapping {
                    private_port: port.private_port,
                    public_port: port.public_port,
                    protocol: port.typ.map(|typ| typ.to_string()).unwrap_or_default(),
                    ip: port.ip.unwrap_or_default(),
                })
                .collect();

            containers.push(Container {
                id: short_id(&full_id),
                name: container_name(summary.names.as_deref()),
                image: summary.image.unwrap_or_default(),
                state: summary.state.unwrap_or_default(),
                status: summary.status.unwrap_or_default(),
                project: project_label(&labels),
                created: summary.created.unwrap_or_default(),
                ports,
                env,
            });
        }
        Ok(containers)
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        let response = self
            .docker
            .list_volumes(None::<ListVolumesOptions<String>>)
            .await
            .context("failed to list volumes")?;
        Ok(response
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(|volume| Volume {
                name: volume.name,
                driver: volume.driver,
                mountpoint: volume.mountpoint,
                scope: volume
                    .scope
                    .map(|scope| scope.to_string())
                    .unwrap_or_default(),
                created: volume.created_at.unwrap_or_default(),
                labels: volume.labels.into_iter().collect::<BTreeMap<_, _>>(),
            })
            .collect())
    }

    async fn list_images(&self) -> Result<Vec<Image>> {
        let images = self
            .docker
            .list_images(Some(ListImagesOptions::<String> {
                all: false,
                ..Default::default()
            }))
            .await
            .context("failed to list images")?;
        Ok(images
            .into_iter()
            .map(|image| Image {
                id: short_image_id(&image.id),
                repo_tags: image.repo_tags,
                size: image.size,
                created: image.created,
            })
            .collect())
    }

    async fn list_networks(&self) -> Result<Vec<Network>> {
        let networks = self
            .docker
            .list_networks(None::<ListNetworksOptions<String>>)
            .await
            .context("failed to list networks")?;
        Ok(networks
            .into_iter()
            .map(|network| Network {
                id: short_id(network.id.as_deref().unwrap_or_default()),
                name: network.name.unwrap_or_default(),
                driver: network.driver.unwrap_or_default(),
                scope: network.scope.unwrap_or_default(),
                internal: network.internal.unwrap_or(false),
                created: network.created.unwrap_or_default(),
            })
            .collect())
    }

    async fn start(&self, id: &str) -> Result<()> {
        self.docker
            .start_container::<String>(id, None)
            .await
            .with_context(|| format!("failed to start container {id}"))
    }

    async fn stop(&self, id: &str) -> Result<()> {
        self.docker
            .stop_container(
                id,
                Some(StopContainerOptions {
                    t: STOP_TIMEOUT_SECS,
                }),
            )
            .await
            .with_context(|| format!("failed to stop container {id}"))
    }

    async fn restart(&self, id: &str) -> Result<()> {
        self.docker
            .restart_container(
                id,
                Some(RestartContainerOptions {
                    t: STOP_TIMEOUT_SECS as isize,
                }),
            )
            .await
            .with_context(|| format!("failed to restart container {id}"))
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .with_context(|| format!("failed to remove container {id}"))
    }

    async fn remove_volume(&self, name: &str) -> Result<()> {
        self.docker
            .remove_volume(name, None::<RemoveVolumeOptions>)
            .await
            .with_context(|| format!("failed to remove volume {name}"))
    }

    async fn remove_image(&self, id: &str) -> Result<()> {
        self.docker
            .remove_image(
                id,
                Some(RemoveImageOptions {
                    force: true,
                    ..Default::default()
                }),
                None,
            )
            .await
            .map(|_| ())
            .with_context(|| format!("failed to remove image {id}"))
    }

    async fn fetch_logs(&self, id: &str, request: LogRequest) -> Result<Vec<u8>> {
        let options = match request {
            LogRequest::Tail(count) => LogsOptions::<String> {
                stdout: true,
                stderr: true,
                timestamps: true,
                tail: count.to_string(),
                ..Default::default()
            },
            LogRequest::Since(cursor) => LogsOptions::<String> {
                stdout: true,
                stderr: true,
                timestamps: true,
                since: cursor.map_or(0, |cursor| cursor.timestamp()),
                tail: "all".to_string(),
                ..Default::default()
            },
        };

        let mut stream = self.docker.logs(id, Some(options));
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("failed to read logs for {id}"))?;
            let (stream_kind, message) = match chunk {
                LogOutput::StdIn { message } => (StreamKind::Stdin, message),
                LogOutput::StdOut { message } => (StreamKind::Stdout, message),
                LogOutput::StdErr { message } => (StreamKind::Stderr, message),
                LogOutput::Console { message } => (StreamKind::Stdout, message),
            };
            bytes.extend(logs::encode_frame(stream_kind, &message));
        }
        Ok(bytes)
    }

    async fn inspect(&self, id: &str) -> Result<String> {
        let detail = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .with_context(|| format!("failed to inspect container {id}"))?;
        serde_json::to_string_pretty(&detail).context("failed to format inspect document")
    }

    async fn stats(&self, id: &str) -> Result<ContainerStats> {
        let mut stream = self.docker.stats(
            id,
            Some(StatsOptions {
                stream: false,
                ..Default::default()
            }),
        );
        let sample = stream
            .next()
            .await
            .with_context(|| format!("no stats sample for {id}"))?
            .with_context(|| format!("failed to read stats for {id}"))?;
        Ok(summarize_stats(&sample))
    }
}

fn summarize_stats(sample: &Stats) -> ContainerStats {
    let cpu_delta = sample
        .cpu_stats
        .cpu_usage
        .total_usage
        .saturating_sub(sample.precpu_stats.cpu_usage.total_usage);
    let system_delta = sample
        .cpu_stats
        .system_cpu_usage
        .unwrap_or(0)
        .saturating_sub(sample.precpu_stats.system_cpu_usage.unwrap_or(0));
    let cpus = sample.cpu_stats.online_cpus.unwrap_or_else(|| {
        sample
            .cpu_stats
            .cpu_usage
            .percpu_usage
            .as_ref()
            .map_or(1, |per_cpu| per_cpu.len() as u64)
    });

    let memory_usage = sample.memory_stats.usage.unwrap_or(0);
    let memory_limit = sample.memory_stats.limit.unwrap_or(0);

    let (net_rx, net_tx) = sample
        .networks
        .as_ref()
        .map(|networks| {
            networks.values().fold((0, 0), |(rx, tx), network| {
                (rx + network.rx_bytes, tx + network.tx_bytes)
            })
        })
        .unwrap_or_default();

    let (block_read, block_write) = sample
        .blkio_stats
        .io_service_bytes_recursive
        .as_deref()
        .unwrap_or_default()
        .iter()
        .fold((0, 0), |(read, write), entry| match entry.op.to_ascii_lowercase().as_str() {
            "read" => (read + entry.value, write),
            "write" => (read, write + entry.value),
            _ => (read, write),
        });

    ContainerStats {
        cpu_percent: cpu_percent(cpu_delta, system_delta, cpus),
        memory_usage,
        memory_limit,
        memory_percent: memory_percent(memory_usage, memory_limit),
        net_rx,
        net_tx,
        block_read,
        block_write,
        pids: sample.pids_stats.current.unwrap_or(0),
    }
}

pub fn cpu_percent(cpu_delta: u64, system_delta: u64, cpus: u64) -> f64 {
    if cpu_delta == 0 || system_delta == 0 {
        return 0.0;
    }
    (cpu_delta as f64 / system_delta as f64) * cpus.max(1) as f64 * 100.0
}

pub fn memory_percent(usage: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    usage as f64 / limit as f64 * 100.0
}

/// Binary-unit size, e.g. `"512 B"` or `"12.00 MiB"`.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1_024;
    const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];
    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut div = UNIT;
    let mut exp = 0usize;
    let mut rest = bytes / UNIT;
    while rest >= UNIT && exp + 1 < PREFIXES.len() {
        div *= UNIT;
        exp += 1;
        rest /= UNIT;
    }
    format!("{:.2} {}iB", bytes as f64 / div as f64, PREFIXES[exp])
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

pub fn short_image_id(id: &str) -> String {
    short_id(id.strip_prefix("sha256:").unwrap_or(id))
}

fn container_name(names: Option<&[String]>) -> String {
    names
        .and_then(|names| names.first())
        .map(|name| name.trim_start_matches('/').to_string())
        .unwrap_or_default()
}

fn project_label(labels: &HashMap<String, String>) -> Option<String> {
    labels
        .get(PROJECT_LABEL)
        .map(|project| project.trim())
        .filter(|project| !project.is_empty())
        .map(str::to_string)
}

/// Picks the first shell present in the container, falling back to `/bin/sh`.
pub async fn detect_shell(container_id: &str) -> String {
    for candidate in SHELL_CANDIDATES {
        let check = TokioCommand::new("docker")
            .arg("exec")
            .arg(container_id)
            .arg("test")
            .arg("-x")
            .arg(candidate)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if matches!(check, Ok(status) if status.success()) {
            return candidate.to_string();
        }
    }
    FALLBACK_SHELL.to_string()
}
