use std::any::{Any, TypeId};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::application::ChatModel;
use crate::domain::{ChatOptions, DomainError, Message};

/// A value flowing between stages.
pub type StageValue = Box<dyn Any + Send>;

/// Runtime identity of a stage's input or output type.
#[derive(Debug, Clone, Copy)]
pub struct TypeSlot {
    id: TypeId,
    name: &'static str,
}

impl TypeSlot {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeSlot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeSlot {}

/// One step of a [`Chain`].
///
/// A stage consumes a value of [`Stage::input_type`] and produces one of
/// [`Stage::output_type`]. Types are checked when the chain is compiled.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    fn input_type(&self) -> TypeSlot;

    fn output_type(&self) -> TypeSlot;

    async fn run(
        &self,
        cancel: &CancellationToken,
        input: StageValue,
    ) -> Result<StageValue, DomainError>;
}

fn downcast<T: 'static>(stage: &str, value: StageValue) -> Result<T, DomainError> {
    value.downcast::<T>().map(|v| *v).map_err(|_| {
        DomainError::internal(format!(
            "stage '{stage}' received a value that is not {}",
            std::any::type_name::<T>()
        ))
    })
}

/// Runs a [`ChatModel`]: conversation in, assistant message out.
pub struct ChatModelStage {
    model: Arc<dyn ChatModel>,
}

impl ChatModelStage {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Stage for ChatModelStage {
    fn name(&self) -> &str {
        self.model.model_name()
    }

    fn input_type(&self) -> TypeSlot {
        TypeSlot::of::<Vec<Message>>()
    }

    fn output_type(&self) -> TypeSlot {
        TypeSlot::of::<Message>()
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        input: StageValue,
    ) -> Result<StageValue, DomainError> {
        let conversation: Vec<Message> = downcast(self.name(), input)?;
        let reply = self
            .model
            .generate(cancel, &conversation, &ChatOptions::default())
            .await?;
        Ok(Box::new(reply))
    }
}

type LambdaFn<A, B> = Box<dyn Fn(A) -> BoxFuture<'static, Result<B, DomainError>> + Send + Sync>;

/// Wraps an async function as a stage.
pub struct LambdaStage<A, B> {
    name: String,
    f: LambdaFn<A, B>,
}

impl<A, B> LambdaStage<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<B, DomainError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(move |input| -> BoxFuture<'static, Result<B, DomainError>> {
                Box::pin(f(input))
            }),
        }
    }
}

#[async_trait]
impl<A, B> Stage for LambdaStage<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn input_type(&self) -> TypeSlot {
        TypeSlot::of::<A>()
    }

    fn output_type(&self) -> TypeSlot {
        TypeSlot::of::<B>()
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        input: StageValue,
    ) -> Result<StageValue, DomainError> {
        let input: A = downcast(&self.name, input)?;
        let pending = (self.f)(input);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DomainError::cancelled()),
            output = pending => Ok(Box::new(output?) as StageValue),
        }
    }
}

/// Builder for a linear pipeline from `I` to `O`.
///
/// Stages are appended in execution order and type-checked by
/// [`Chain::compile`].
pub struct Chain<I, O> {
    stages: Vec<Arc<dyn Stage>>,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O> Chain<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn append_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn append_chat_model(self, model: Arc<dyn ChatModel>) -> Self {
        self.append_stage(Arc::new(ChatModelStage::new(model)))
    }

    pub fn append_lambda<A, B, F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        A: Send + 'static,
        B: Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<B, DomainError>> + Send + 'static,
    {
        self.append_stage(Arc::new(LambdaStage::new(name, f)))
    }

    /// Validate the stage sequence and finalize it into a [`Runnable`].
    pub fn compile(self) -> Result<Runnable<I, O>, DomainError> {
        let first = self
            .stages
            .first()
            .ok_or_else(|| DomainError::invalid_pipeline("chain has no stages"))?;

        let chain_input = TypeSlot::of::<I>();
        if first.input_type() != chain_input {
            return Err(DomainError::invalid_pipeline(format!(
                "stage '{}' expects {} but the chain input is {}",
                first.name(),
                first.input_type().name(),
                chain_input.name()
            )));
        }

        for pair in self.stages.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            if from.output_type() != to.input_type() {
                return Err(DomainError::invalid_pipeline(format!(
                    "stage '{}' produces {} but stage '{}' expects {}",
                    from.name(),
                    from.output_type().name(),
                    to.name(),
                    to.input_type().name()
                )));
            }
        }

        let chain_output = TypeSlot::of::<O>();
        if let Some(last) = self.stages.last() {
            if last.output_type() != chain_output {
                return Err(DomainError::invalid_pipeline(format!(
                    "stage '{}' produces {} but the chain output is {}",
                    last.name(),
                    last.output_type().name(),
                    chain_output.name()
                )));
            }
        }

        debug!("Compiled chain with {} stage(s)", self.stages.len());

        Ok(Runnable {
            stages: self.stages,
            _marker: PhantomData,
        })
    }
}

impl<I, O> Default for Chain<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled, invokable chain.
pub struct Runnable<I, O> {
    stages: Vec<Arc<dyn Stage>>,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O> Runnable<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Run `input` through every stage in order.
    ///
    /// Stage errors are returned unchanged. A cancelled token stops the chain
    /// before the next stage and is forwarded to the running one.
    pub async fn invoke(&self, cancel: &CancellationToken, input: I) -> Result<O, DomainError> {
        let mut value: StageValue = Box::new(input);
        for stage in &self.stages {
            if cancel.is_cancelled() {
                return Err(DomainError::cancelled());
            }
            debug!("Running stage '{}'", stage.name());
            value = stage.run(cancel, value).await?;
        }
        downcast("chain output", value)
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::application::MessageStream;
    use crate::connector::MockChatModel;
    use crate::domain::ToolInfo;

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn generate(
            &self,
            _cancel: &CancellationToken,
            _input: &[Message],
            _options: &ChatOptions,
        ) -> Result<Message, DomainError> {
            Err(DomainError::protocol(429, "rate limited"))
        }

        async fn stream(
            &self,
            _cancel: &CancellationToken,
            _input: &[Message],
            _options: &ChatOptions,
        ) -> Result<MessageStream, DomainError> {
            Err(DomainError::unsupported("stream not implemented"))
        }

        fn bind_tools(&self, _tools: &[ToolInfo]) -> Result<(), DomainError> {
            Ok(())
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    fn mock() -> Arc<dyn ChatModel> {
        Arc::new(MockChatModel::new())
    }

    #[test]
    fn empty_chain_does_not_compile() {
        let err = Chain::<Vec<Message>, Message>::new()
            .compile()
            .err()
            .expect("empty chain must fail");
        assert!(err.is_invalid_pipeline());
    }

    #[test]
    fn single_chat_model_stage_compiles() {
        let runnable = Chain::<Vec<Message>, Message>::new()
            .append_chat_model(mock())
            .compile()
            .expect("chain should compile");
        assert_eq!(runnable.stage_names(), vec!["mock-chat"]);
    }

    #[test]
    fn chain_input_mismatch_is_rejected() {
        let err = Chain::<String, Message>::new()
            .append_chat_model(mock())
            .compile()
            .err()
            .expect("mismatched input must fail");
        assert!(err.is_invalid_pipeline());
        assert!(err.to_string().contains("chain input"));
    }

    #[test]
    fn chain_output_mismatch_is_rejected() {
        let err = Chain::<Vec<Message>, String>::new()
            .append_chat_model(mock())
            .compile()
            .err()
            .expect("mismatched output must fail");
        assert!(err.to_string().contains("chain output"));
    }

    #[test]
    fn adjacent_stage_mismatch_is_rejected() {
        let err = Chain::<Vec<Message>, usize>::new()
            .append_chat_model(mock())
            .append_lambda("length", |s: String| async move { Ok::<_, DomainError>(s.len()) })
            .compile()
            .err()
            .expect("adjacent mismatch must fail");
        assert!(err.to_string().contains("'length' expects"));
    }

    #[tokio::test]
    async fn invoke_returns_assistant_message() {
        let runnable = Chain::<Vec<Message>, Message>::new()
            .append_chat_model(mock())
            .compile()
            .unwrap();

        let out = runnable
            .invoke(&CancellationToken::new(), vec![Message::user("hello")])
            .await
            .unwrap();

        assert_eq!(out.role, crate::domain::Role::Assistant);
        assert_eq!(out.content, "mock reply: hello");
    }

    #[tokio::test]
    async fn lambda_stages_compose_with_chat_model() {
        let runnable = Chain::<String, usize>::new()
            .append_lambda("to_conversation", |s: String| async move {
                Ok::<_, DomainError>(vec![Message::system("be brief"), Message::user(s)])
            })
            .append_chat_model(mock())
            .append_lambda("content_length", |m: Message| async move {
                Ok::<_, DomainError>(m.content.len())
            })
            .compile()
            .unwrap();

        let len = runnable
            .invoke(&CancellationToken::new(), "abc".to_string())
            .await
            .unwrap();
        assert_eq!(len, "mock reply: abc".len());
    }

    #[tokio::test]
    async fn stage_errors_propagate_unchanged() {
        let runnable = Chain::<Vec<Message>, Message>::new()
            .append_chat_model(Arc::new(FailingModel))
            .compile()
            .unwrap();

        let err = runnable
            .invoke(&CancellationToken::new(), vec![Message::user("hi")])
            .await
            .unwrap_err();

        match err {
            DomainError::Protocol { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn cancelled_token_fails_before_first_stage() {
        let runnable = Chain::<Vec<Message>, Message>::new()
            .append_chat_model(mock())
            .compile()
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = runnable
            .invoke(&cancel, vec![Message::user("hi")])
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn cancellation_reaches_running_stage() {
        let runnable = Chain::<Vec<Message>, Vec<Message>>::new()
            .append_lambda("stall", |m: Vec<Message>| async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, DomainError>(m)
            })
            .compile()
            .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = runnable
            .invoke(&cancel, vec![Message::user("hi")])
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
