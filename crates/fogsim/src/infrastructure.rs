//! Infrastructure graph: compute nodes connected by network links.

use std::collections::HashMap;

use fogsim_power_models::{
    Capacity, CapacityBoundPowerModel, LinkPowerModel, NodePowerModel, PerBitPowerModel, PowerMeasurement,
    RateBoundPowerModel,
};

use crate::error::{EntityKind, Error, Result};

/// Node index in the infrastructure, assigned sequentially starting from 0.
pub type NodeId = usize;

/// Link index in the infrastructure, assigned sequentially starting from 0.
pub type LinkId = usize;

/// A compute resource (sensor, fog, edge or cloud) with a capacity in compute units and a power model.
#[derive(Clone)]
pub struct Node {
    name: String,
    capacity: Capacity,
    used_cu: f64,
    power_model: Box<dyn NodePowerModel>,
}

impl Node {
    /// Creates a node with arbitrary power model.
    pub fn new(name: &str, capacity: Capacity, power_model: Box<dyn NodePowerModel>) -> Self {
        Self {
            name: name.to_owned(),
            capacity,
            used_cu: 0.,
            power_model,
        }
    }

    /// Creates a node with finite capacity whose power grows linearly from `static_power` to `max_power`.
    pub fn capacity_bound(name: &str, cu: f64, static_power: f64, max_power: f64) -> Self {
        Self::new(
            name,
            Capacity::Finite(cu),
            Box::new(CapacityBoundPowerModel::new(static_power, max_power)),
        )
    }

    /// Creates a node with unbounded capacity drawing `power_per_cu` per allocated compute unit.
    pub fn rate_bound(name: &str, power_per_cu: f64) -> Self {
        Self::new(name, Capacity::Unbounded, Box::new(RateBoundPowerModel::new(power_per_cu)))
    }

    /// Node name, unique within the infrastructure.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node capacity in compute units.
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Compute units currently allocated on the node.
    pub fn used_cu(&self) -> f64 {
        self.used_cu
    }

    /// Compute units still available, `None` for unbounded nodes.
    pub fn remaining_cu(&self) -> Option<f64> {
        self.capacity.remaining(self.used_cu)
    }

    /// Returns `true` if `cu` more compute units can be allocated on the node.
    pub fn fits(&self, cu: f64) -> bool {
        self.capacity.fits(self.used_cu, cu)
    }

    /// Evaluates the node power model for the current allocation.
    pub fn power(&self, time: f64) -> Result<PowerMeasurement> {
        self.power_model
            .get_power(time, self.used_cu, self.capacity)
            .map_err(|e| Error::InvalidConfiguration(format!("node '{}': {}", self.name, e)))
    }

    fn allocate(&mut self, cu: f64) -> Result<()> {
        if !self.fits(cu) {
            return Err(Error::CapacityExceeded {
                kind: EntityKind::Node,
                name: self.name.clone(),
                requested: cu,
                used: self.used_cu,
                capacity: match self.capacity {
                    Capacity::Finite(limit) => limit,
                    Capacity::Unbounded => f64::INFINITY,
                },
            });
        }
        self.used_cu += cu;
        Ok(())
    }

    fn release(&mut self, cu: f64) {
        self.used_cu = (self.used_cu - cu).max(0.);
    }
}

/// A directed network connection from one node to another.
#[derive(Clone)]
pub struct Link {
    src: String,
    dst: String,
    latency: f64,
    bandwidth: Capacity,
    used_bandwidth: f64,
    power_model: Box<dyn LinkPowerModel>,
}

impl Link {
    /// Creates a link with arbitrary power model.
    ///
    /// * `bandwidth` - bits per time unit the link can carry.
    pub fn new(src: &str, dst: &str, latency: f64, bandwidth: Capacity, power_model: Box<dyn LinkPowerModel>) -> Self {
        Self {
            src: src.to_owned(),
            dst: dst.to_owned(),
            latency,
            bandwidth,
            used_bandwidth: 0.,
            power_model,
        }
    }

    /// Creates a link drawing `power_per_bit` for every bit transferred.
    pub fn per_bit(src: &str, dst: &str, latency: f64, bandwidth: Capacity, power_per_bit: f64) -> Self {
        Self::new(src, dst, latency, bandwidth, Box::new(PerBitPowerModel::new(power_per_bit)))
    }

    /// Source node name.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Destination node name.
    pub fn dst(&self) -> &str {
        &self.dst
    }

    /// Link identity in the form `src->dst`.
    pub fn name(&self) -> String {
        link_name(&self.src, &self.dst)
    }

    /// Link latency.
    pub fn latency(&self) -> f64 {
        self.latency
    }

    /// Link bandwidth in bits per time unit.
    pub fn bandwidth(&self) -> Capacity {
        self.bandwidth
    }

    /// Bits per time unit currently reserved by data flows.
    pub fn used_bandwidth(&self) -> f64 {
        self.used_bandwidth
    }

    /// Evaluates the link power model for the bits transferred during a unit interval.
    pub fn power(&self, time: f64) -> Result<PowerMeasurement> {
        self.power_model
            .get_power(time, self.used_bandwidth)
            .map_err(|e| Error::InvalidConfiguration(format!("link '{}': {}", self.name(), e)))
    }

    fn allocate(&mut self, bit_rate: f64) -> Result<()> {
        if !self.bandwidth.fits(self.used_bandwidth, bit_rate) {
            return Err(Error::CapacityExceeded {
                kind: EntityKind::Link,
                name: self.name(),
                requested: bit_rate,
                used: self.used_bandwidth,
                capacity: match self.bandwidth {
                    Capacity::Finite(limit) => limit,
                    Capacity::Unbounded => f64::INFINITY,
                },
            });
        }
        self.used_bandwidth += bit_rate;
        Ok(())
    }

    fn release(&mut self, bit_rate: f64) {
        self.used_bandwidth = (self.used_bandwidth - bit_rate).max(0.);
    }
}

pub(crate) fn link_name(src: &str, dst: &str) -> String {
    format!("{}->{}", src, dst)
}

/// A measurable entity of the infrastructure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    /// Compute node.
    Node(NodeId),
    /// Network link.
    Link(LinkId),
}

/// Owns nodes and links, tracks their usage and resolves identities.
#[derive(Clone, Default)]
pub struct Infrastructure {
    nodes: Vec<Node>,
    node_ids: HashMap<String, NodeId>,
    links: Vec<Link>,
    link_ids: HashMap<(NodeId, NodeId), LinkId>,
    // outgoing links of each node in insertion order
    adjacency: Vec<Vec<(NodeId, LinkId)>>,
}

impl Infrastructure {
    /// Creates empty infrastructure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId> {
        if self.node_ids.contains_key(&node.name) {
            return Err(Error::DuplicateIdentity {
                kind: EntityKind::Node,
                name: node.name,
            });
        }
        node.capacity
            .validate()
            .and_then(|_| node.power_model.validate(node.capacity))
            .map_err(|e| Error::InvalidConfiguration(format!("node '{}': {}", node.name, e)))?;
        let id = self.nodes.len();
        self.node_ids.insert(node.name.clone(), id);
        self.nodes.push(node);
        self.adjacency.push(Vec::new());
        Ok(id)
    }

    /// Registers a link between two registered nodes.
    pub fn add_link(&mut self, link: Link) -> Result<LinkId> {
        let endpoint = |name: &str| {
            self.node_ids.get(name).copied().ok_or_else(|| Error::DanglingEndpoint {
                src: link.src.clone(),
                dst: link.dst.clone(),
                missing: name.to_owned(),
            })
        };
        let src = endpoint(&link.src)?;
        let dst = endpoint(&link.dst)?;
        if self.link_ids.contains_key(&(src, dst)) {
            return Err(Error::DuplicateIdentity {
                kind: EntityKind::Link,
                name: link.name(),
            });
        }
        if !(link.latency.is_finite() && link.latency >= 0.) {
            return Err(Error::InvalidConfiguration(format!(
                "link '{}': latency must be finite and non-negative",
                link.name()
            )));
        }
        link.bandwidth
            .validate()
            .and_then(|_| link.power_model.validate())
            .map_err(|e| Error::InvalidConfiguration(format!("link '{}': {}", link.name(), e)))?;
        let id = self.links.len();
        self.link_ids.insert((src, dst), id);
        self.adjacency[src].push((dst, id));
        self.links.push(link);
        Ok(id)
    }

    /// Returns node by its name.
    pub fn node(&self, name: &str) -> Result<&Node> {
        self.node_id(name).map(|id| &self.nodes[id])
    }

    /// Returns the id of node with specified name.
    pub fn node_id(&self, name: &str) -> Result<NodeId> {
        self.node_ids
            .get(name)
            .copied()
            .ok_or_else(|| Error::not_found(EntityKind::Node, name))
    }

    /// Returns node by its id.
    ///
    /// Panics if node with such id does not exist.
    pub fn node_by_id(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Returns link by its endpoints.
    pub fn link(&self, src: &str, dst: &str) -> Result<&Link> {
        self.link_id(src, dst).map(|id| &self.links[id])
    }

    /// Returns the id of link with specified endpoints.
    pub fn link_id(&self, src: &str, dst: &str) -> Result<LinkId> {
        let not_found = || Error::not_found(EntityKind::Link, &link_name(src, dst));
        let src = self.node_ids.get(src).ok_or_else(not_found)?;
        let dst = self.node_ids.get(dst).ok_or_else(not_found)?;
        self.link_ids.get(&(*src, *dst)).copied().ok_or_else(not_found)
    }

    /// Returns link by its id.
    ///
    /// Panics if link with such id does not exist.
    pub fn link_by_id(&self, id: LinkId) -> &Link {
        &self.links[id]
    }

    /// Returns all nodes in registration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns all links in registration order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Allocates compute units on the node. The node usage is left unchanged on failure.
    pub fn allocate_cu(&mut self, node: NodeId, cu: f64) -> Result<()> {
        self.nodes[node].allocate(cu)
    }

    /// Releases compute units previously allocated on the node.
    pub fn release_cu(&mut self, node: NodeId, cu: f64) {
        self.nodes[node].release(cu)
    }

    /// Reserves bandwidth on the link. The link usage is left unchanged on failure.
    pub fn allocate_bandwidth(&mut self, link: LinkId, bit_rate: f64) -> Result<()> {
        self.links[link].allocate(bit_rate)
    }

    /// Releases bandwidth previously reserved on the link.
    pub fn release_bandwidth(&mut self, link: LinkId, bit_rate: f64) {
        self.links[link].release(bit_rate)
    }

    /// Returns the minimum-latency sequence of links leading from `src` to `dst`.
    ///
    /// Among paths of equal latency the one discovered through earlier registered links wins. The path from a node
    /// to itself is empty.
    pub fn route(&self, src: NodeId, dst: NodeId) -> Result<Vec<LinkId>> {
        let n = self.nodes.len();
        let mut dist = vec![f64::INFINITY; n];
        let mut parent: Vec<Option<(NodeId, LinkId)>> = vec![None; n];
        let mut visited = vec![false; n];
        dist[src] = 0.;
        loop {
            let next = (0..n)
                .filter(|&v| !visited[v] && dist[v].is_finite())
                .min_by(|&a, &b| dist[a].total_cmp(&dist[b]));
            let Some(cur) = next else {
                break;
            };
            if cur == dst {
                break;
            }
            visited[cur] = true;
            for &(next, link) in &self.adjacency[cur] {
                let candidate = dist[cur] + self.links[link].latency;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    parent[next] = Some((cur, link));
                }
            }
        }
        if !dist[dst].is_finite() {
            return Err(Error::not_found(
                EntityKind::Path,
                &link_name(&self.nodes[src].name, &self.nodes[dst].name),
            ));
        }
        let mut path = Vec::new();
        let mut cur = dst;
        while let Some((prev, link)) = parent[cur] {
            path.push(link);
            cur = prev;
        }
        path.reverse();
        Ok(path)
    }

    /// Returns the total latency of a path.
    pub fn path_latency(&self, path: &[LinkId]) -> f64 {
        path.iter().map(|&l| self.links[l].latency).sum()
    }

    /// Returns the current power of a single entity.
    pub fn entity_power(&self, entity: Entity, time: f64) -> Result<PowerMeasurement> {
        match entity {
            Entity::Node(id) => self.nodes[id].power(time),
            Entity::Link(id) => self.links[id].power(time),
        }
    }

    /// Sums the current power of the given entities. Does not modify anything.
    pub fn aggregate_power(&self, entities: &[Entity], time: f64) -> Result<PowerMeasurement> {
        let mut total = PowerMeasurement::default();
        for entity in entities {
            total += self.entity_power(*entity, time)?;
        }
        Ok(total)
    }

    /// Sums the current power of all nodes and links.
    pub fn power(&self, time: f64) -> Result<PowerMeasurement> {
        let mut total = PowerMeasurement::default();
        for node in &self.nodes {
            total += node.power(time)?;
        }
        for link in &self.links {
            total += link.power(time)?;
        }
        Ok(total)
    }

    /// Returns the allocated compute units of every node in registration order.
    pub fn used_cu_snapshot(&self) -> Vec<(String, f64)> {
        self.nodes.iter().map(|n| (n.name.clone(), n.used_cu)).collect()
    }
}
