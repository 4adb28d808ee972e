use tezos_core::{
    types::{
        Operation, OperationMetadata, OperationPayload, OperationWithCounter,
        SignedOperationPayload, SignedProtocolOperationPayload, Watermark,
    },
    utils::ForgeError,
};
use tezos_signers::Signer;
use thiserror::Error;
use tracing::{instrument, trace};

#[derive(Error, Debug)]
/// Error thrown while turning operations into a signed payload
pub enum PayloadError {
    /// A payload needs at least one operation
    #[error("payload has no operations")]
    Empty,

    /// A field could not be encoded
    #[error(transparent)]
    Forge(#[from] ForgeError),

    /// The signer failed or refused to sign
    #[error("signing unavailable: {0}")]
    SigningUnavailable(Box<dyn std::error::Error + Send + Sync>),
}

/// Builds operation payloads, signs them and prepares them for submission.
///
/// ```
/// # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
/// use tezos_core::types::{Operation, OperationMetadata, Tez};
/// use tezos_middleware::PayloadAssembler;
/// use tezos_signers::Wallet;
///
/// let wallet: Wallet = "edsk3gUfUPyBSfrS9CCgmCiQsTCHGkviBDusMxDJstFtojtc1zcpsh".parse()?;
/// let metadata = OperationMetadata {
///     chain_id: "NetXdQprcVkpaWU".to_owned(),
///     branch: "BLockGenesisGenesisGenesisGenesisGenesisf79b5d1CoW2".to_owned(),
///     protocol: "PsCARTHAGazKbHtnKfLzQg3kms52kSRpgnDY982a9oYsSXRLQEb".to_owned(),
///     counter: 0,
///     key: Some(wallet.public_key()),
/// };
///
/// let assembler = PayloadAssembler::default();
/// let transfer = Operation::transaction(wallet.address(), wallet.address(), Tez::from_mutez(1));
/// let payload = assembler.build_payload(vec![transfer], &metadata);
/// assert_eq!(payload.contents()[0].counter(), 1);
///
/// let signed = assembler.sign(payload, &wallet).await?;
/// let ready = assembler.wrap_for_protocol(signed, &metadata);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct PayloadAssembler {
    watermark: Watermark,
}

impl PayloadAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signs with another watermark than the generic operation one
    #[must_use]
    pub fn with_watermark(mut self, watermark: Watermark) -> Self {
        self.watermark = watermark;
        self
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    /// Binds `operations` to consecutive counters following the source's last
    /// one, in the given order, and anchors them to the metadata's branch.
    pub fn build_payload(
        &self,
        operations: Vec<Operation>,
        metadata: &OperationMetadata,
    ) -> OperationPayload {
        let contents = operations
            .into_iter()
            .zip(metadata.counter + 1..)
            .map(|(operation, counter)| OperationWithCounter::new(operation, counter))
            .collect();
        OperationPayload::from_parts(metadata.branch.clone(), contents)
    }

    /// Signs the watermarked binary form of `payload`
    #[instrument(
        skip_all,
        fields(branch = payload.branch(), operations = payload.contents().len()),
        err
    )]
    pub async fn sign<S: Signer>(
        &self,
        payload: OperationPayload,
        signer: &S,
    ) -> Result<SignedOperationPayload, PayloadError> {
        if payload.is_empty() {
            return Err(PayloadError::Empty)
        }

        let forged = payload.forge()?;
        let mut message = Vec::with_capacity(forged.len() + 1);
        message.push(self.watermark.as_byte());
        message.extend_from_slice(&forged);
        trace!(bytes = forged.len(), "signing payload");

        let signature = signer
            .sign_message(message)
            .await
            .map_err(|err| PayloadError::SigningUnavailable(Box::new(err)))?;
        Ok(SignedOperationPayload::new(payload, signature))
    }

    /// Tags a signed payload with the protocol it targets
    pub fn wrap_for_protocol(
        &self,
        signed: SignedOperationPayload,
        metadata: &OperationMetadata,
    ) -> SignedProtocolOperationPayload {
        SignedProtocolOperationPayload::new(signed, metadata.protocol.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tezos_core::types::{Address, PublicKey, Signature, Tez};
    use tezos_signers::Wallet;

    const SECRET: &str = "edsk3gUfUPyBSfrS9CCgmCiQsTCHGkviBDusMxDJstFtojtc1zcpsh";

    fn metadata(counter: u64) -> OperationMetadata {
        OperationMetadata {
            chain_id: "NetXdQprcVkpaWU".to_owned(),
            branch: "BLockGenesisGenesisGenesisGenesisGenesisf79b5d1CoW2".to_owned(),
            protocol: "PsCARTHAGazKbHtnKfLzQg3kms52kSRpgnDY982a9oYsSXRLQEb".to_owned(),
            counter,
            key: None,
        }
    }

    fn transfers(source: Address, count: u64) -> Vec<Operation> {
        (1..=count).map(|i| Operation::transaction(source, source, Tez::from_mutez(i))).collect()
    }

    #[test]
    fn counters_follow_the_metadata() {
        let wallet: Wallet = SECRET.parse().unwrap();
        let operations = transfers(wallet.address(), 3);
        let payload = PayloadAssembler::new().build_payload(operations.clone(), &metadata(5));

        let counters: Vec<_> = payload.contents().iter().map(|op| op.counter()).collect();
        assert_eq!(counters, [6, 7, 8]);
        let kept: Vec<_> = payload.contents().iter().map(|op| op.operation().clone()).collect();
        assert_eq!(kept, operations);
    }

    #[tokio::test]
    async fn signs_watermarked_bytes() {
        let wallet: Wallet = SECRET.parse().unwrap();
        let assembler = PayloadAssembler::new();
        let payload = assembler.build_payload(transfers(wallet.address(), 2), &metadata(0));
        let forged = payload.forge().unwrap();

        let signed = assembler.sign(payload, &wallet).await.unwrap();
        let signature = signed.signature();
        signature.verify(Watermark::GenericOperation, &forged, &wallet.public_key()).unwrap();
        // the watermark is part of what was signed
        assert!(signature.verify(Watermark::Block, &forged, &wallet.public_key()).is_err());

        let wrapped = assembler.wrap_for_protocol(signed.clone(), &metadata(0));
        assert_eq!(wrapped.protocol(), "PsCARTHAGazKbHtnKfLzQg3kms52kSRpgnDY982a9oYsSXRLQEb");
        assert_eq!(wrapped.signed(), &signed);
    }

    #[tokio::test]
    async fn empty_payloads_are_not_signed() {
        let wallet: Wallet = SECRET.parse().unwrap();
        let assembler = PayloadAssembler::new();
        let payload = assembler.build_payload(vec![], &metadata(0));
        assert!(matches!(assembler.sign(payload, &wallet).await, Err(PayloadError::Empty)));
    }

    #[derive(Debug)]
    struct Broken(PublicKey);

    #[derive(Debug, Error)]
    #[error("device unplugged")]
    struct Unplugged;

    #[async_trait]
    impl Signer for Broken {
        type Error = Unplugged;

        async fn sign_message<S: Send + Sync + AsRef<[u8]>>(
            &self,
            _message: S,
        ) -> Result<Signature, Self::Error> {
            Err(Unplugged)
        }

        fn public_key(&self) -> PublicKey {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn signer_failures_are_reported() {
        let wallet: Wallet = SECRET.parse().unwrap();
        let assembler = PayloadAssembler::new();
        let payload = assembler.build_payload(transfers(wallet.address(), 1), &metadata(0));

        let err = assembler.sign(payload, &Broken(wallet.public_key())).await.unwrap_err();
        assert!(matches!(err, PayloadError::SigningUnavailable(_)));
        assert!(err.to_string().contains("device unplugged"));
    }
}
