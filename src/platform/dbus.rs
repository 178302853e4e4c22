use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{info, warn};
use zbus::fdo::{DBusProxy, PeerProxy};
use zbus::names::BusName;
use zbus::proxy::CacheProperties;
use zbus::zvariant::ObjectPath;
use zbus::{proxy, Connection};

use crate::config::{BusKind, DbusConfig};
use crate::platform::{EventStream, MessageEvent, ReceiptEvent, SignalService};

#[proxy(
    interface = "org.asamk.Signal",
    default_service = "org.asamk.Signal",
    default_path = "/org/asamk/Signal",
    gen_blocking = false
)]
trait Signal {
    #[zbus(name = "getContactName")]
    fn get_contact_name(&self, number: &str) -> zbus::Result<String>;

    #[zbus(name = "getGroupName")]
    fn get_group_name(&self, group_id: &[u8]) -> zbus::Result<String>;

    #[zbus(signal)]
    fn message_received(
        &self,
        timestamp: i64,
        sender: String,
        group_id: Vec<u8>,
        message: String,
        attachments: Vec<String>,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    fn receipt_received(&self, timestamp: i64, sender: String) -> zbus::Result<()>;
}

/// How the bus can provide the daemon's service name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Availability {
    Running,
    /// Not running, but the bus starts it on the first method call
    Activatable,
    Missing,
}

impl Availability {
    fn from_bus(owned: bool, activatable: bool) -> Self {
        if owned {
            Availability::Running
        } else if activatable {
            Availability::Activatable
        } else {
            Availability::Missing
        }
    }
}

/// signal-cli daemon reached over D-Bus
pub struct DbusSignal {
    proxy: SignalProxy<'static>,
}

impl DbusSignal {
    /// Connect to the configured bus and bind to the daemon's object.
    /// An activatable daemon is started; a service the bus cannot provide
    /// is a connection fault.
    pub async fn connect(config: &DbusConfig) -> Result<Self> {
        let connection = match config.bus {
            BusKind::System => Connection::system().await,
            BusKind::Session => Connection::session().await,
        }
        .with_context(|| format!("Failed to connect to the {} bus", config.bus))?;

        let service = BusName::try_from(config.service.clone())
            .with_context(|| format!("Invalid service name: {}", config.service))?;
        let path = ObjectPath::try_from(config.object_path.clone())
            .with_context(|| format!("Invalid object path: {}", config.object_path))?;

        let dbus = DBusProxy::new(&connection)
            .await
            .context("Failed to create bus proxy")?;
        let owned = dbus
            .name_has_owner(service.clone())
            .await
            .with_context(|| format!("Failed to query owner of {}", config.service))?;
        let activatable = !owned
            && dbus
                .list_activatable_names()
                .await
                .context("Failed to list activatable services")?
                .iter()
                .any(|name| name.as_str() == service.as_str());

        match Availability::from_bus(owned, activatable) {
            Availability::Running => {}
            Availability::Activatable => {
                info!("Starting activatable service {}", config.service);
                // Any method call routed to the name makes the bus start it
                let peer = PeerProxy::builder(&connection)
                    .destination(service.clone())?
                    .path(path.clone())?
                    .build()
                    .await
                    .context("Failed to create peer proxy")?;
                if let Err(e) = peer.ping().await {
                    warn!("Ping to {} failed: {}", config.service, e);
                }
                if !dbus.name_has_owner(service.clone()).await? {
                    bail!(
                        "Service {} could not be started on the {} bus",
                        config.service,
                        config.bus
                    );
                }
            }
            Availability::Missing => bail!(
                "Service {} is not available on the {} bus",
                config.service,
                config.bus
            ),
        }

        let signal = Self::from_connection(&connection, service, path).await?;

        info!(
            "Bound to {} at {} on the {} bus",
            config.service, config.object_path, config.bus
        );

        Ok(signal)
    }

    /// Bind to the daemon's object over an already established connection.
    pub async fn from_connection(
        connection: &Connection,
        service: BusName<'static>,
        path: ObjectPath<'static>,
    ) -> Result<Self> {
        let proxy = SignalProxy::builder(connection)
            .destination(service)?
            .path(path)?
            .cache_properties(CacheProperties::No)
            .build()
            .await
            .context("Failed to create Signal proxy")?;
        Ok(Self { proxy })
    }
}

/// The daemon sends an empty byte array for direct messages.
fn message_event(
    timestamp: i64,
    sender: &str,
    group_id: &[u8],
    message: &str,
    attachments: &[String],
) -> MessageEvent {
    MessageEvent {
        timestamp,
        source: sender.to_string(),
        group_id: (!group_id.is_empty()).then(|| group_id.to_vec()),
        message: Some(message.to_string()),
        attachments: Some(attachments.to_vec()),
    }
}

#[async_trait]
impl SignalService for DbusSignal {
    async fn contact_name(&self, source: &str) -> Result<String> {
        self.proxy
            .get_contact_name(source)
            .await
            .with_context(|| format!("getContactName failed for {}", source))
    }

    async fn group_name(&self, group_id: &[u8]) -> Result<String> {
        self.proxy
            .get_group_name(group_id)
            .await
            .context("getGroupName failed")
    }

    async fn subscribe_messages(&self) -> Result<EventStream<MessageEvent>> {
        let stream = self
            .proxy
            .receive_message_received()
            .await
            .context("Failed to subscribe to MessageReceived")?;

        Ok(stream
            .map(|signal| -> Result<_> {
                let args = signal
                    .args()
                    .context("Malformed MessageReceived signal")?;
                Ok(message_event(
                    *args.timestamp(),
                    args.sender(),
                    args.group_id(),
                    args.message(),
                    args.attachments(),
                ))
            })
            .boxed())
    }

    async fn subscribe_receipts(&self) -> Result<EventStream<ReceiptEvent>> {
        let stream = self
            .proxy
            .receive_receipt_received()
            .await
            .context("Failed to subscribe to ReceiptReceived")?;

        Ok(stream
            .map(|signal| -> Result<_> {
                let args = signal
                    .args()
                    .context("Malformed ReceiptReceived signal")?;
                Ok(ReceiptEvent {
                    timestamp: *args.timestamp(),
                    source: args.sender().to_string(),
                })
            })
            .boxed())
    }
}
