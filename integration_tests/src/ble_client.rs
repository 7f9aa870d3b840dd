//! BLE client for the WRCD peripheral.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::protocol::WRCD_SERVICE_UUID;

/// One received notification
#[derive(Debug, Clone)]
pub struct Notification {
    pub uuid: Uuid,
    pub value: Vec<u8>,
    pub at: std::time::Instant,
}

/// BLE client for the WRCD device.
pub struct WrcdClient {
    peripheral: Peripheral,
    characteristics: Vec<Characteristic>,
    /// Notifications received since the last take
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl WrcdClient {
    /// Scan for a device by name advertising the WRCD service and connect.
    pub async fn connect_by_name(name: &str, scan_timeout: Duration) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No Bluetooth adapters found"))?;

        adapter
            .start_scan(ScanFilter {
                services: vec![WRCD_SERVICE_UUID],
            })
            .await?;
        let peripheral = Self::find_device_by_name(&adapter, name, scan_timeout).await?;
        adapter.stop_scan().await?;

        peripheral.connect().await?;
        peripheral.discover_services().await?;
        let characteristics = peripheral.characteristics().into_iter().collect();

        let notifications = Arc::new(Mutex::new(Vec::new()));

        let sink = notifications.clone();
        let peripheral_clone = peripheral.clone();
        tokio::spawn(async move {
            let mut stream = match peripheral_clone.notifications().await {
                Ok(s) => s,
                Err(_) => return,
            };

            while let Some(data) = stream.next().await {
                sink.lock().await.push(Notification {
                    uuid: data.uuid,
                    value: data.value,
                    at: std::time::Instant::now(),
                });
            }
        });

        Ok(Self {
            peripheral,
            characteristics,
            notifications,
        })
    }

    /// Find a device by name within the scan timeout.
    async fn find_device_by_name(adapter: &Adapter, name: &str, scan_timeout: Duration) -> Result<Peripheral> {
        let start = std::time::Instant::now();

        while start.elapsed() < scan_timeout {
            for peripheral in adapter.peripherals().await? {
                if let Some(props) = peripheral.properties().await? {
                    if props.local_name.as_deref() == Some(name) {
                        return Ok(peripheral);
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(anyhow!("Device '{}' not found within timeout", name))
    }

    fn characteristic(&self, uuid: Uuid) -> Result<&Characteristic> {
        self.characteristics
            .iter()
            .find(|c| c.uuid == uuid)
            .ok_or_else(|| anyhow!("characteristic {} not found", uuid))
    }

    pub async fn read(&self, uuid: Uuid) -> Result<Vec<u8>> {
        Ok(self.peripheral.read(self.characteristic(uuid)?).await?)
    }

    /// Write with response, so a rejected value surfaces as an error.
    pub async fn write(&self, uuid: Uuid, value: &[u8]) -> Result<()> {
        self.peripheral
            .write(self.characteristic(uuid)?, value, WriteType::WithResponse)
            .await?;
        Ok(())
    }

    pub async fn subscribe(&self, uuid: Uuid) -> Result<()> {
        Ok(self.peripheral.subscribe(self.characteristic(uuid)?).await?)
    }

    pub async fn unsubscribe(&self, uuid: Uuid) -> Result<()> {
        Ok(self.peripheral.unsubscribe(self.characteristic(uuid)?).await?)
    }

    /// Take the notifications of `uuid` received so far.
    pub async fn take_notifications(&self, uuid: Uuid) -> Vec<Notification> {
        let mut all = self.notifications.lock().await;
        let (taken, rest) = all.drain(..).partition(|n| n.uuid == uuid);
        *all = rest;
        taken
    }

    /// Wait until `count` notifications of `uuid` arrived.
    pub async fn wait_for_notifications(&self, uuid: Uuid, count: usize, wait: Duration) -> Result<Vec<Notification>> {
        let start = std::time::Instant::now();
        loop {
            let received = self.notifications.lock().await.iter().filter(|n| n.uuid == uuid).count();
            if received >= count {
                return Ok(self.take_notifications(uuid).await);
            }
            if start.elapsed() > wait {
                return Err(anyhow!("got {} of {} notifications", received, count));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
