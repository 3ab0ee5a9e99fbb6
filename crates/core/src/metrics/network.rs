use crate::{error::Result, model::NetworkCounters, platform::InterfaceDrops};
use std::collections::HashMap;
use sysinfo::Networks;

pub struct NetworkCollector {
    networks: Networks,
}

impl NetworkCollector {
    pub fn new() -> Result<Self> {
        let networks = Networks::new_with_refreshed_list();

        Ok(Self { networks })
    }

    /// Cumulative counters for every interface, sorted by name.
    ///
    /// The interface list is refreshed too, so interfaces brought up after
    /// startup are picked up.
    pub fn collect(&mut self, drops: &HashMap<String, InterfaceDrops>) -> Result<Vec<NetworkCounters>> {
        self.networks.refresh_list();

        let mut networks: Vec<NetworkCounters> = self
            .networks
            .iter()
            .map(|(interface_name, data)| {
                let dropped = drops.get(interface_name);
                NetworkCounters {
                    interface_name: interface_name.clone(),
                    bytes_sent: data.total_transmitted(),
                    bytes_recv: data.total_received(),
                    packets_sent: data.total_packets_transmitted(),
                    packets_recv: data.total_packets_received(),
                    errin: data.total_errors_on_received(),
                    errout: data.total_errors_on_transmitted(),
                    dropin: dropped.map(|d| d.dropin),
                    dropout: dropped.map(|d| d.dropout),
                }
            })
            .collect();

        networks.sort_by(|a, b| a.interface_name.cmp(&b.interface_name));
        Ok(networks)
    }
}
