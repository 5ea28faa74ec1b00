//! End-to-end chat over a real BroadcastServer.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures_util::StreamExt;
use tokio::time::{sleep, timeout};
use ws_broadcast::{BroadcastServer, Error, LifecycleState, MessageChannel, ServerConfig};

async fn within<F: Future>(future: F) -> Result<F::Output> {
    timeout(Duration::from_secs(5), future)
        .await
        .context("step timed out")
}

async fn settle(server: &BroadcastServer, clients: usize) -> Result<()> {
    within(async {
        while server.client_count() != clients {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
}

#[tokio::test]
async fn chat_round_trip_preserves_order() -> Result<()> {
    let server = BroadcastServer::bind(ServerConfig::default()).await?;

    let mut channels = Vec::new();
    for _ in 0..3 {
        let channel = MessageChannel::open(&server.ws_url())?;
        within(channel.wait_open()).await??;
        channels.push(channel);
    }
    settle(&server, 3).await?;

    let sender = &channels[0];
    for text in ["one", "two", "three"] {
        sender.send(text)?;
    }

    for channel in &channels {
        let messages = channel.messages().context("messages already taken")?;
        let received: Vec<String> = within(messages.take(3).map(|e| e.into_text()).collect()).await?;

        let bodies: Vec<&str> = received
            .iter()
            .map(|line| line.split_once(": ").map_or("", |(_, body)| body))
            .collect();
        assert_eq!(bodies, vec!["one", "two", "three"]);

        let prefix = received[0].split_once(": ").map(|(name, _)| name);
        assert!(received.iter().all(|line| line.split_once(": ").map(|(n, _)| n) == prefix));
    }

    server.shutdown();
    Ok(())
}

#[tokio::test]
async fn markup_is_relayed_verbatim() -> Result<()> {
    let server = BroadcastServer::bind(ServerConfig::default()).await?;
    let channel = MessageChannel::open(&server.ws_url())?;
    let mut messages = channel.messages().context("messages already taken")?;
    within(channel.wait_open()).await??;
    settle(&server, 1).await?;

    channel.send("<script>alert(1)</script>")?;

    let Some(event) = within(messages.next()).await? else {
        bail!("inbound sequence ended early");
    };
    assert!(event.text().ends_with(": <script>alert(1)</script>"));

    server.shutdown();
    Ok(())
}

#[tokio::test]
async fn premature_send_is_rejected_then_accepted() -> Result<()> {
    let server = BroadcastServer::bind(ServerConfig::default()).await?;
    let channel = MessageChannel::open(&server.ws_url())?;

    match channel.send("too early") {
        Err(Error::NotReady {
            state: LifecycleState::Connecting,
        }) => {}
        other => bail!("expected NotReady while connecting, got {other:?}"),
    }

    within(channel.wait_open()).await??;
    settle(&server, 1).await?;
    channel.send("on time")?;

    let mut messages = channel.messages().context("messages already taken")?;
    let Some(event) = within(messages.next()).await? else {
        bail!("inbound sequence ended early");
    };
    assert!(event.text().ends_with(": on time"));
    assert_eq!(event.seq(), 0);

    server.shutdown();
    Ok(())
}

#[tokio::test]
async fn server_shutdown_closes_channel() -> Result<()> {
    let server = BroadcastServer::bind(ServerConfig::default()).await?;
    let channel = MessageChannel::open(&server.ws_url())?;
    within(channel.wait_open()).await??;
    settle(&server, 1).await?;

    server.shutdown();

    let path: Vec<LifecycleState> = within(channel.lifecycle().into_stream().collect()).await?;
    assert_eq!(
        path,
        vec![
            LifecycleState::Connecting,
            LifecycleState::Open,
            LifecycleState::Closed
        ]
    );
    assert!(channel.send("after").unwrap_err().is_not_ready());
    Ok(())
}
