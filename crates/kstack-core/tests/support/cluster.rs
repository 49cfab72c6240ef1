//! In-memory cluster with call recording and scripted workload listings.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};

use kstack_core::cluster::{ClusterClient, ClusterResult};
use kstack_core::error::ClusterError;
use kstack_core::types::{ClusterResource, ManifestLocator, NamespacePhase, WorkloadRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    NamespaceGet(String),
    NamespaceCreate(String),
    NamespaceDelete(String),
    ListResources(String),
    Apply(String),
    ListWorkloads(Option<String>),
    Exec(String, Vec<String>),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::NamespaceCreate(_) | Self::NamespaceDelete(_) | Self::Apply(_) | Self::Exec(..)
        )
    }
}

type Listing = Result<Vec<WorkloadRow>, String>;

#[derive(Default)]
struct State {
    namespaces: BTreeMap<String, NamespacePhase>,
    /// Checks a terminating namespace survives before it disappears.
    terminating_checks: HashMap<String, u32>,
    delete_lag: u32,
    resources: BTreeMap<String, Vec<ClusterResource>>,
    workloads: HashMap<Option<String>, Vec<WorkloadRow>>,
    scripted: HashMap<Option<String>, VecDeque<Listing>>,
    fail_create: bool,
    fail_delete: bool,
    fail_list_resources: bool,
    fail_apply: Option<String>,
    fail_exec: bool,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct FakeCluster {
    state: RefCell<State>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(self, namespace: &str, phase: NamespacePhase) -> Self {
        self.state
            .borrow_mut()
            .namespaces
            .insert(namespace.to_string(), phase);
        self
    }

    /// Existing resources; also creates the namespace as Active.
    pub fn with_resources(self, namespace: &str, names: &[(&str, &str)]) -> Self {
        let resources = names
            .iter()
            .map(|(kind, name)| ClusterResource::new(*kind, *name, namespace))
            .collect();
        {
            let mut state = self.state.borrow_mut();
            state
                .namespaces
                .insert(namespace.to_string(), NamespacePhase::Active);
            state.resources.insert(namespace.to_string(), resources);
        }
        self
    }

    /// Rows returned for `selector` once any scripted listings are used up.
    pub fn with_workloads(self, selector: Option<&str>, rows: Vec<WorkloadRow>) -> Self {
        self.state
            .borrow_mut()
            .workloads
            .insert(selector.map(str::to_string), rows);
        self
    }

    /// Listings returned one per call for `selector`, before the steady rows.
    pub fn script_workloads(self, selector: Option<&str>, ticks: Vec<Listing>) -> Self {
        self.state
            .borrow_mut()
            .scripted
            .entry(selector.map(str::to_string))
            .or_default()
            .extend(ticks);
        self
    }

    /// A deleted namespace stays Terminating for `checks` lookups.
    pub fn with_delete_lag(self, checks: u32) -> Self {
        self.state.borrow_mut().delete_lag = checks;
        self
    }

    pub fn terminating_for(self, namespace: &str, checks: u32) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state
                .namespaces
                .insert(namespace.to_string(), NamespacePhase::Terminating);
            state
                .terminating_checks
                .insert(namespace.to_string(), checks);
        }
        self
    }

    pub fn failing_create(self) -> Self {
        self.state.borrow_mut().fail_create = true;
        self
    }

    pub fn failing_delete(self) -> Self {
        self.state.borrow_mut().fail_delete = true;
        self
    }

    pub fn failing_resource_listing(self) -> Self {
        self.state.borrow_mut().fail_list_resources = true;
        self
    }

    /// Reject applies whose manifest contains `fragment`.
    pub fn failing_apply(self, fragment: &str) -> Self {
        self.state.borrow_mut().fail_apply = Some(fragment.to_string());
        self
    }

    pub fn failing_exec(self) -> Self {
        self.state.borrow_mut().fail_exec = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn applied(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Apply(manifest) => Some(manifest),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn mutations(&self) -> usize {
        self.count(Call::is_mutation)
    }

    pub fn namespace_phase(&self, namespace: &str) -> Option<NamespacePhase> {
        self.state.borrow().namespaces.get(namespace).copied()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

fn failed(command: &str, stderr: &str) -> ClusterError {
    ClusterError::CommandFailed {
        command: command.to_string(),
        code: 1,
        stderr: stderr.to_string(),
    }
}

impl ClusterClient for FakeCluster {
    fn namespace_get(&self, namespace: &str) -> ClusterResult<Option<NamespacePhase>> {
        self.record(Call::NamespaceGet(namespace.to_string()));
        let mut state = self.state.borrow_mut();
        match state.namespaces.get(namespace).copied() {
            Some(NamespacePhase::Terminating) => {
                let remaining = state
                    .terminating_checks
                    .get(namespace)
                    .copied()
                    .unwrap_or(0);
                if remaining == 0 {
                    state.namespaces.remove(namespace);
                    state.terminating_checks.remove(namespace);
                    Ok(None)
                } else {
                    state
                        .terminating_checks
                        .insert(namespace.to_string(), remaining - 1);
                    Ok(Some(NamespacePhase::Terminating))
                }
            }
            phase => Ok(phase),
        }
    }

    fn namespace_create(&self, namespace: &str) -> ClusterResult<()> {
        self.record(Call::NamespaceCreate(namespace.to_string()));
        let mut state = self.state.borrow_mut();
        if state.fail_create {
            return Err(failed("kubectl create namespace", "forbidden"));
        }
        state
            .namespaces
            .insert(namespace.to_string(), NamespacePhase::Active);
        Ok(())
    }

    fn namespace_delete(&self, namespace: &str) -> ClusterResult<()> {
        self.record(Call::NamespaceDelete(namespace.to_string()));
        let mut state = self.state.borrow_mut();
        if state.fail_delete {
            return Err(failed("kubectl delete namespace", "forbidden"));
        }
        if state.namespaces.contains_key(namespace) {
            let lag = state.delete_lag;
            state
                .namespaces
                .insert(namespace.to_string(), NamespacePhase::Terminating);
            state.terminating_checks.insert(namespace.to_string(), lag);
            state.resources.remove(namespace);
        }
        Ok(())
    }

    fn list_resources(&self, namespace: &str) -> ClusterResult<Vec<ClusterResource>> {
        self.record(Call::ListResources(namespace.to_string()));
        let state = self.state.borrow();
        if state.fail_list_resources {
            return Err(failed("kubectl get all", "connection refused"));
        }
        Ok(state.resources.get(namespace).cloned().unwrap_or_default())
    }

    fn apply(&self, manifest: &ManifestLocator, _namespace: &str) -> ClusterResult<()> {
        let arg = manifest.as_apply_arg();
        self.record(Call::Apply(arg.clone()));
        let state = self.state.borrow();
        if let Some(fragment) = &state.fail_apply
            && arg.contains(fragment.as_str())
        {
            return Err(failed("kubectl apply", "admission webhook denied the request"));
        }
        Ok(())
    }

    fn list_workloads(
        &self,
        _namespace: &str,
        selector: Option<&str>,
    ) -> ClusterResult<Vec<WorkloadRow>> {
        let key = selector.map(str::to_string);
        self.record(Call::ListWorkloads(key.clone()));
        let mut state = self.state.borrow_mut();
        if let Some(next) = state.scripted.get_mut(&key).and_then(VecDeque::pop_front) {
            return next.map_err(|stderr| failed("kubectl get pods", &stderr));
        }
        Ok(state.workloads.get(&key).cloned().unwrap_or_default())
    }

    fn exec(
        &self,
        _namespace: &str,
        pod: &str,
        _container: Option<&str>,
        command: &[String],
    ) -> ClusterResult<String> {
        self.record(Call::Exec(pod.to_string(), command.to_vec()));
        if self.state.borrow().fail_exec {
            return Err(failed("kubectl exec", "container not found"));
        }
        Ok("Created topic ecom_transactions.\n".to_string())
    }
}
