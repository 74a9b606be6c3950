// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/meshguard

//! Mesh simulator for demo/testing
//!
//! Produces the same numeric frames a gateway would: every node reports
//! all-clear in round-robin order, with occasional single-shot noise triggers
//! and occasional real intrusion bursts long enough to be confirmed. Nodes
//! marked silent never transmit, so they drop offline at the first sweep.

use std::time::Duration;
use async_trait::async_trait;
use rand::prelude::*;
use rand::rngs::StdRng;

use super::{SensorKey, Topology, MAX_ADDRESSABLE_NODE};
use crate::error::Result;
use crate::streaming::LineSource;

/// Simulated gateway feed
pub struct MeshSimulator {
    topology: Topology,
    interval: Duration,
    rng: StdRng,
    silent: Vec<u8>,
    next_node: u8,
    /// Sensor currently being tripped and the frames left in the burst
    burst: Option<(SensorKey, u32)>,
    noise_probability: f64,
    burst_probability: f64,
    burst_length: u32,
    frames: u64,
}

impl MeshSimulator {
    /// Entropy-seeded simulator emitting roughly one frame per `interval`
    pub fn new(topology: Topology, interval: Duration) -> Self {
        Self::with_rng(topology, interval, StdRng::from_entropy())
    }

    /// Deterministic simulator for tests
    pub fn with_seed(topology: Topology, interval: Duration, seed: u64) -> Self {
        Self::with_rng(topology, interval, StdRng::seed_from_u64(seed))
    }

    fn with_rng(topology: Topology, interval: Duration, rng: StdRng) -> Self {
        Self {
            topology,
            interval,
            rng,
            silent: Vec::new(),
            next_node: 1,
            burst: None,
            noise_probability: 0.03,
            burst_probability: 0.01,
            burst_length: 3,
            frames: 0,
        }
    }

    /// Keep `node` off the air
    pub fn with_silent_node(mut self, node: u8) -> Self {
        self.silent.push(node);
        self
    }

    /// Frames per intrusion burst, at least 1
    pub fn with_burst_length(mut self, frames: u32) -> Self {
        self.burst_length = frames.max(1);
        self
    }

    /// Per-frame chance of a noise trigger and of starting a burst
    pub fn with_probabilities(mut self, noise: f64, burst: f64) -> Self {
        self.noise_probability = noise.clamp(0.0, 1.0);
        self.burst_probability = burst.clamp(0.0, 1.0);
        self
    }

    /// Frames emitted so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Highest node a one-digit frame can carry
    fn last_node(&self) -> u8 {
        self.topology.node_count().min(MAX_ADDRESSABLE_NODE)
    }

    fn live_nodes(&self) -> impl Iterator<Item = u8> + '_ {
        (1..=self.last_node()).filter(move |n| !self.silent.contains(n))
    }

    fn random_key(&mut self) -> Option<SensorKey> {
        let nodes: Vec<u8> = self.live_nodes().collect();
        let node = *nodes.choose(&mut self.rng)?;
        let sensor = self.rng.gen_range(1..=self.topology.sensors_per_node());
        Some(SensorKey::new(node, sensor))
    }

    fn next_heartbeat_node(&mut self) -> Option<u8> {
        let last = self.last_node();
        for _ in 0..last {
            let node = self.next_node;
            self.next_node = if node >= last { 1 } else { node + 1 };
            if !self.silent.contains(&node) {
                return Some(node);
            }
        }
        None
    }

    /// Next frame without waiting; `None` when every node is silent
    pub fn next_frame(&mut self) -> Option<String> {
        if let Some((key, remaining)) = self.burst.take() {
            if remaining > 1 {
                self.burst = Some((key, remaining - 1));
            }
            self.frames += 1;
            return Some(format!("{}{}", key.node, key.sensor));
        }

        let roll: f64 = self.rng.gen();
        if roll < self.burst_probability {
            if let Some(key) = self.random_key() {
                self.burst = Some((key, self.burst_length));
                return self.next_frame();
            }
        } else if roll < self.burst_probability + self.noise_probability {
            if let Some(key) = self.random_key() {
                self.frames += 1;
                return Some(format!("{}{}", key.node, key.sensor));
            }
        }

        let node = self.next_heartbeat_node()?;
        self.frames += 1;
        Some(format!("{}0", node))
    }
}

#[async_trait]
impl LineSource for MeshSimulator {
    fn name(&self) -> &str {
        "mesh simulator"
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        let jitter = self.rng.gen_range(0.5..1.5);
        tokio::time::sleep(self.interval.mul_f64(jitter)).await;
        Ok(self.next_frame())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::decode;

    fn topology() -> Topology {
        Topology::new(9, 4).unwrap()
    }

    #[test]
    fn test_frames_always_decode() {
        let topo = topology();
        let mut sim = MeshSimulator::with_seed(topo, Duration::from_millis(10), 7)
            .with_probabilities(0.2, 0.1);

        for _ in 0..2_000 {
            let frame = sim.next_frame().unwrap();
            assert!(decode(&frame, &topo).is_ok(), "bad frame {:?}", frame);
        }
        assert_eq!(sim.frames(), 2_000);
    }

    #[test]
    fn test_silent_node_never_transmits() {
        let topo = topology();
        let mut sim = MeshSimulator::with_seed(topo, Duration::from_millis(10), 11)
            .with_silent_node(7)
            .with_probabilities(0.2, 0.1);

        for _ in 0..2_000 {
            let frame = sim.next_frame().unwrap();
            assert!(!frame.starts_with('7'), "silent node sent {:?}", frame);
        }
    }

    #[test]
    fn test_heartbeats_round_robin() {
        let topo = Topology::new(3, 4).unwrap();
        let mut sim = MeshSimulator::with_seed(topo, Duration::from_millis(10), 1)
            .with_probabilities(0.0, 0.0);

        let frames: Vec<_> = (0..6).filter_map(|_| sim.next_frame()).collect();
        assert_eq!(frames, vec!["10", "20", "30", "10", "20", "30"]);
    }

    #[test]
    fn test_burst_repeats_one_sensor() {
        let topo = topology();
        let mut sim = MeshSimulator::with_seed(topo, Duration::from_millis(10), 3)
            .with_probabilities(0.0, 1.0)
            .with_burst_length(3);

        let first = sim.next_frame().unwrap();
        assert_eq!(sim.next_frame().unwrap(), first);
        assert_eq!(sim.next_frame().unwrap(), first);
        assert!(!first.ends_with('0'));
    }

    #[test]
    fn test_all_silent_ends() {
        let topo = Topology::new(1, 1).unwrap();
        let mut sim = MeshSimulator::with_seed(topo, Duration::from_millis(10), 5)
            .with_silent_node(1);
        assert!(sim.next_frame().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_line_source_paces_output() {
        let topo = topology();
        let mut sim = MeshSimulator::with_seed(topo, Duration::from_millis(100), 9)
            .with_probabilities(0.0, 0.0);
        let start = tokio::time::Instant::now();

        assert_eq!(sim.next_line().await.unwrap().as_deref(), Some("10"));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_wide_topology_stays_addressable() {
        let topo = Topology::new(12, 4).unwrap();
        let mut sim = MeshSimulator::with_seed(topo, Duration::from_millis(10), 21)
            .with_probabilities(0.3, 0.2);

        for _ in 0..2_000 {
            let frame = sim.next_frame().unwrap();
            let event = decode(&frame, &topo).unwrap();
            // Re-encoding must give the same frame, so no node id got split
            assert_eq!(format!("{}{}", event.node, event.sensor), frame);
            assert!(event.node <= MAX_ADDRESSABLE_NODE);
        }

        let mut quiet = MeshSimulator::with_seed(topo, Duration::from_millis(10), 4)
            .with_probabilities(0.0, 0.0);
        let nodes: Vec<_> = (0..10).filter_map(|_| quiet.next_frame()).collect();
        assert_eq!(nodes[8], "90");
        assert_eq!(nodes[9], "10");
    }
}
