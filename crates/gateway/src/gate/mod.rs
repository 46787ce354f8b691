//! The gate: session-aware, policy-checked dispatch of client calls.
//!
//! Every call resolves the caller's session from its network address,
//! applies the operation's policy tier, invokes the collaborators under the
//! configured deadline, and renders a reply envelope.  Collaborator failures
//! (including deadline expiry) become a business-failure envelope; only the
//! gate's own [`GateError`] kinds fail a call outright.

mod context;
mod error;

pub use context::CallContext;
pub use error::GateError;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use cg_backend::{AccountStore, IdAllocator};
use cg_domain::error::{Error, Result as BackendResult};
use cg_domain::trace::TraceEvent;
use cg_protocol::{
    AddFriendReply, AddFriendRequest, CreateGroupRequest, FindUserRequest, GetUserInfoRequest,
    IdReply, LoginRequest, Method, RegisterRequest, Reply, UpdateUserInfoRequest, UserInfoReply,
};
use cg_sessions::{Session, SessionRegistry};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Policy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session requirement of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// No session requirement; the registry is not consulted.
    Anonymous,
    /// The caller's session is resolved, created on first contact.
    SessionBound,
    /// The caller's session must be Online.
    Authenticated,
}

/// Policy tier of each operation.  Admission is applied from this table.
pub fn policy(method: Method) -> Policy {
    match method {
        Method::Register | Method::Login => Policy::SessionBound,
        Method::UpdateUserInfo
        | Method::GetUserInfo
        | Method::AddFriend
        | Method::FindUser
        | Method::CreateGroup => Policy::Authenticated,
        Method::UpdateUserPassword
        | Method::Logout
        | Method::UserMessage
        | Method::Heartbeat
        | Method::UploadImage
        | Method::DownloadImage
        | Method::Notice => Policy::Anonymous,
    }
}

/// Whether the gate serves `method`, as opposed to failing it with
/// [`GateError::NotImplemented`].
pub fn is_implemented(method: Method) -> bool {
    match method {
        Method::Register
        | Method::UpdateUserInfo
        | Method::GetUserInfo
        | Method::Login
        | Method::AddFriend
        | Method::FindUser
        | Method::CreateGroup => true,
        Method::UpdateUserPassword
        | Method::Logout
        | Method::UserMessage
        | Method::Heartbeat
        | Method::UploadImage
        | Method::DownloadImage
        | Method::Notice => false,
    }
}

/// What admission established about a caller.
struct Admission {
    method: Method,
    session: Option<Arc<Session>>,
    user_id: Option<i64>,
}

impl Admission {
    /// The caller's session.  Only SessionBound and Authenticated tiers
    /// carry one.
    fn session(&self) -> Result<&Arc<Session>, GateError> {
        self.session.as_ref().ok_or(GateError::InvalidContext)
    }

    /// The caller's session and bound user id.  Only the Authenticated tier
    /// carries an id.
    fn caller(&self) -> Result<(&Arc<Session>, i64), GateError> {
        let session = self.session()?;
        self.user_id
            .map(|id| (session, id))
            .ok_or(GateError::Unauthenticated {
                method: self.method,
            })
    }
}

/// Reply of any implemented operation, serialised without a wrapper.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GateReply {
    Id(Reply<IdReply>),
    UserInfo(Reply<UserInfoReply>),
    AddFriend(Reply<AddFriendReply>),
}

impl GateReply {
    pub fn is_rejected(&self) -> bool {
        match self {
            Self::Id(r) => r.is_rejected(),
            Self::UserInfo(r) => r.is_rejected(),
            Self::AddFriend(r) => r.is_rejected(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Gate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Gate {
    registry: Arc<SessionRegistry>,
    allocator: Arc<dyn IdAllocator>,
    store: Arc<dyn AccountStore>,
    call_timeout: Duration,
}

impl Gate {
    pub fn new(
        registry: Arc<SessionRegistry>,
        allocator: Arc<dyn IdAllocator>,
        store: Arc<dyn AccountStore>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            allocator,
            store,
            call_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    // ── admission ────────────────────────────────────────────────────

    /// Apply the policy tier of `method` to the caller.
    fn admit(&self, method: Method, ctx: &CallContext) -> Result<Admission, GateError> {
        let mut admission = Admission {
            method,
            session: None,
            user_id: None,
        };
        if policy(method) == Policy::Anonymous {
            return Ok(admission);
        }

        let address = ctx
            .remote_address()
            .map_err(|e| self.rejected_call(method, None, e))?;
        let session = self.registry.resolve(address);

        if policy(method) == Policy::Authenticated {
            match session.online_identity() {
                Some(user_id) => admission.user_id = Some(user_id),
                None => {
                    return Err(self.rejected_call(
                        method,
                        Some(session.address()),
                        GateError::Unauthenticated { method },
                    ))
                }
            }
        }

        admission.session = Some(session);
        Ok(admission)
    }

    fn rejected_call(&self, method: Method, address: Option<&str>, err: GateError) -> GateError {
        tracing::debug!(method = %method, address, error = %err, "call rejected");
        TraceEvent::CallRejected {
            method: method.as_str().to_owned(),
            address: address.map(str::to_owned),
            kind: err.kind().to_owned(),
        }
        .emit();
        err
    }

    // ── collaborator calls ───────────────────────────────────────────

    /// Run one collaborator call under the per-call deadline.
    async fn call<T>(
        &self,
        service: &str,
        fut: impl Future<Output = BackendResult<T>>,
    ) -> BackendResult<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "{service} did not answer within {}ms",
                self.call_timeout.as_millis()
            ))),
        }
    }

    fn business_failure<T: Default>(&self, method: Method, address: &str, err: Error) -> Reply<T> {
        tracing::warn!(
            method = %method,
            address,
            error = %err,
            "collaborator call failed"
        );
        Reply::rejected(err.to_string())
    }

    // ── operations ───────────────────────────────────────────────────

    /// Allocate an id and create the account under it.
    pub async fn register(
        &self,
        ctx: &CallContext,
        req: RegisterRequest,
    ) -> Result<Reply<IdReply>, GateError> {
        let admission = self.admit(Method::Register, ctx)?;
        self.serve_register(&admission, req).await
    }

    pub async fn update_user_info(
        &self,
        ctx: &CallContext,
        req: UpdateUserInfoRequest,
    ) -> Result<Reply<IdReply>, GateError> {
        let admission = self.admit(Method::UpdateUserInfo, ctx)?;
        self.serve_update_user_info(&admission, req).await
    }

    pub async fn get_user_info(
        &self,
        ctx: &CallContext,
        req: GetUserInfoRequest,
    ) -> Result<Reply<UserInfoReply>, GateError> {
        let admission = self.admit(Method::GetUserInfo, ctx)?;
        self.serve_get_user_info(&admission, req).await
    }

    /// Check credentials and bind the caller's session to the account.
    ///
    /// A failed login leaves the session exactly as it was.
    pub async fn login(
        &self,
        ctx: &CallContext,
        req: LoginRequest,
    ) -> Result<Reply<IdReply>, GateError> {
        let admission = self.admit(Method::Login, ctx)?;
        self.serve_login(&admission, req).await
    }

    /// Send or confirm a friend request from the caller to `req.user_id`.
    pub async fn add_friend(
        &self,
        ctx: &CallContext,
        req: AddFriendRequest,
    ) -> Result<Reply<AddFriendReply>, GateError> {
        let admission = self.admit(Method::AddFriend, ctx)?;
        self.serve_add_friend(&admission, req).await
    }

    pub async fn find_user(
        &self,
        ctx: &CallContext,
        req: FindUserRequest,
    ) -> Result<Reply<IdReply>, GateError> {
        let admission = self.admit(Method::FindUser, ctx)?;
        self.serve_find_user(&admission, req).await
    }

    /// Allocate a group id and record the caller as its owner.
    pub async fn create_group(
        &self,
        ctx: &CallContext,
        req: CreateGroupRequest,
    ) -> Result<Reply<IdReply>, GateError> {
        let admission = self.admit(Method::CreateGroup, ctx)?;
        self.serve_create_group(&admission, req).await
    }

    /// Fail an operation the gate does not serve.  The registry is not
    /// touched.
    pub fn not_implemented(&self, method: Method, ctx: &CallContext) -> GateError {
        let address = ctx.remote_address().ok();
        self.rejected_call(method, address, GateError::NotImplemented(method))
    }

    // ── dynamic dispatch ─────────────────────────────────────────────

    /// Dispatch a call with a JSON request body.
    ///
    /// Unserved methods fail first, then the method's policy tier is applied,
    /// and only an admitted caller has its body decoded.
    pub async fn dispatch(
        &self,
        ctx: &CallContext,
        method: Method,
        body: serde_json::Value,
    ) -> Result<GateReply, GateError> {
        if !is_implemented(method) {
            return Err(self.not_implemented(method, ctx));
        }
        let admission = self.admit(method, ctx)?;

        match method {
            Method::Register => self
                .serve_register(&admission, decode(method, body)?)
                .await
                .map(GateReply::Id),
            Method::UpdateUserInfo => self
                .serve_update_user_info(&admission, decode(method, body)?)
                .await
                .map(GateReply::Id),
            Method::GetUserInfo => self
                .serve_get_user_info(&admission, decode(method, body)?)
                .await
                .map(GateReply::UserInfo),
            Method::Login => self
                .serve_login(&admission, decode(method, body)?)
                .await
                .map(GateReply::Id),
            Method::AddFriend => self
                .serve_add_friend(&admission, decode(method, body)?)
                .await
                .map(GateReply::AddFriend),
            Method::FindUser => self
                .serve_find_user(&admission, decode(method, body)?)
                .await
                .map(GateReply::Id),
            Method::CreateGroup => self
                .serve_create_group(&admission, decode(method, body)?)
                .await
                .map(GateReply::Id),
            Method::UpdateUserPassword
            | Method::Logout
            | Method::UserMessage
            | Method::Heartbeat
            | Method::UploadImage
            | Method::DownloadImage
            | Method::Notice => Err(self.not_implemented(method, ctx)),
        }
    }

    // ── admitted handlers ────────────────────────────────────────────

    async fn serve_register(
        &self,
        admission: &Admission,
        req: RegisterRequest,
    ) -> Result<Reply<IdReply>, GateError> {
        let method = Method::Register;
        let address = admission.session()?.address();

        let id = match self.call("master", self.allocator.allocate_id()).await {
            Ok(id) => id,
            Err(e) => return Ok(self.business_failure(method, address, e)),
        };

        if let Err(e) = self
            .call("store", self.store.register(&req.user, &req.password, id))
            .await
        {
            return Ok(self.business_failure(method, address, e));
        }

        tracing::info!(address, user = %req.user, id, "user registered");
        Ok(Reply::ok(IdReply { id }))
    }

    async fn serve_update_user_info(
        &self,
        admission: &Admission,
        req: UpdateUserInfoRequest,
    ) -> Result<Reply<IdReply>, GateError> {
        let (session, user_id) = admission.caller()?;

        match self
            .call(
                "store",
                self.store
                    .update_user_info(&req.user, &req.nick_name, &req.avatar),
            )
            .await
        {
            Ok(id) => {
                tracing::debug!(user_id, user = %req.user, "user info updated");
                Ok(Reply::ok(IdReply { id }))
            }
            Err(e) => Ok(self.business_failure(Method::UpdateUserInfo, session.address(), e)),
        }
    }

    async fn serve_get_user_info(
        &self,
        admission: &Admission,
        req: GetUserInfoRequest,
    ) -> Result<Reply<UserInfoReply>, GateError> {
        let (session, _) = admission.caller()?;

        match self.call("store", self.store.get_user_info(&req.user)).await {
            Ok(info) => Ok(Reply::ok(UserInfoReply {
                id: info.id,
                user: info.user,
                nick_name: info.nick_name,
                avatar: info.avatar,
            })),
            Err(e) => Ok(self.business_failure(Method::GetUserInfo, session.address(), e)),
        }
    }

    async fn serve_login(
        &self,
        admission: &Admission,
        req: LoginRequest,
    ) -> Result<Reply<IdReply>, GateError> {
        let address = admission.session()?.address();

        match self
            .call("store", self.store.authenticate(&req.user, &req.password))
            .await
        {
            Ok(id) => {
                // Bound through the registry: the entry may have been swept
                // while the store was answering.
                self.registry.authenticate(address, id);
                tracing::info!(address, user = %req.user, id, "user logged in");
                Ok(Reply::ok(IdReply { id }))
            }
            Err(e) => Ok(self.business_failure(Method::Login, address, e)),
        }
    }

    async fn serve_add_friend(
        &self,
        admission: &Admission,
        req: AddFriendRequest,
    ) -> Result<Reply<AddFriendReply>, GateError> {
        let (session, user_id) = admission.caller()?;

        match self
            .call("store", self.store.add_friend(user_id, req.user_id, req.confirm))
            .await
        {
            Ok(confirm) => Ok(Reply::ok(AddFriendReply { confirm })),
            Err(e) => Ok(self.business_failure(Method::AddFriend, session.address(), e)),
        }
    }

    async fn serve_find_user(
        &self,
        admission: &Admission,
        req: FindUserRequest,
    ) -> Result<Reply<IdReply>, GateError> {
        let (session, _) = admission.caller()?;

        match self.call("store", self.store.find_user(&req.user)).await {
            Ok(id) => Ok(Reply::ok(IdReply { id })),
            Err(e) => Ok(self.business_failure(Method::FindUser, session.address(), e)),
        }
    }

    async fn serve_create_group(
        &self,
        admission: &Admission,
        _req: CreateGroupRequest,
    ) -> Result<Reply<IdReply>, GateError> {
        let method = Method::CreateGroup;
        let (session, owner_id) = admission.caller()?;
        let address = session.address();

        let group_id = match self.call("master", self.allocator.allocate_id()).await {
            Ok(id) => id,
            Err(e) => return Ok(self.business_failure(method, address, e)),
        };

        if let Err(e) = self
            .call("store", self.store.create_group(owner_id, group_id))
            .await
        {
            return Ok(self.business_failure(method, address, e));
        }

        tracing::info!(owner_id, group_id, "group created");
        Ok(Reply::ok(IdReply { id: group_id }))
    }
}

/// Decode a request body; `null` is treated as an empty object.
fn decode<T: DeserializeOwned>(method: Method, body: serde_json::Value) -> Result<T, GateError> {
    let body = match body {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(body).map_err(|e| GateError::InvalidRequest {
        method,
        reason: e.to_string(),
    })
}
