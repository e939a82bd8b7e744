use std::{borrow::Cow, fmt::Display, str::FromStr};

const KRB5_ARCS: &[u32] = &[1, 2, 840, 113554, 1, 2, 2];
const SPNEGO_ARCS: &[u32] = &[1, 3, 6, 1, 5, 5, 2];
const NT_KRB5_PRINCIPAL_ARCS: &[u32] = &[1, 2, 840, 113554, 1, 2, 2, 1];
const NT_USER_NAME_ARCS: &[u32] = &[1, 2, 840, 113554, 1, 2, 1, 1];
const NT_HOSTBASED_SERVICE_ARCS: &[u32] = &[1, 2, 840, 113554, 1, 2, 1, 4];
const NT_EXPORT_NAME_ARCS: &[u32] = &[1, 3, 6, 1, 5, 6, 4];

/// Kerberos v5 mechanism
pub static KRB5: Oid = Oid::from_static(KRB5_ARCS);
/// SPNEGO pseudo-mechanism
pub static SPNEGO: Oid = Oid::from_static(SPNEGO_ARCS);
pub static NT_KRB5_PRINCIPAL: Oid = Oid::from_static(NT_KRB5_PRINCIPAL_ARCS);
pub static NT_USER_NAME: Oid = Oid::from_static(NT_USER_NAME_ARCS);
pub static NT_HOSTBASED_SERVICE: Oid = Oid::from_static(NT_HOSTBASED_SERVICE_ARCS);
pub static NT_EXPORT_NAME: Oid = Oid::from_static(NT_EXPORT_NAME_ARCS);

pub(crate) static KRB5_NAME_TYPES: [Oid; 4] = [
    Oid::from_static(NT_USER_NAME_ARCS),
    Oid::from_static(NT_HOSTBASED_SERVICE_ARCS),
    Oid::from_static(NT_EXPORT_NAME_ARCS),
    Oid::from_static(NT_KRB5_PRINCIPAL_ARCS),
];

/// An ASN.1 object identifier naming a mechanism or a name type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid(Cow<'static, [u32]>);

impl Oid {
    /// Panics on fewer than two arcs, at compile time in a `static`
    pub const fn from_static(arcs: &'static [u32]) -> Self {
        assert!(arcs.len() >= 2, "an object identifier has at least two arcs");
        Self(Cow::Borrowed(arcs))
    }
    pub fn from_arcs(arcs: Vec<u32>) -> Result<Self, InvalidOid> {
        validate(&arcs)?;
        Ok(Self(Cow::Owned(arcs)))
    }
    pub fn arcs(&self) -> &[u32] {
        &self.0
    }
    /// The DER content octets, without tag and length
    pub fn to_der(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() + 4);
        let first = u64::from(self.0[0]) * 40 + u64::from(self.0[1]);
        push_base128(&mut out, first);
        for arc in &self.0[2..] {
            push_base128(&mut out, u64::from(*arc));
        }
        out
    }
    pub fn from_der(content: &[u8]) -> Result<Self, InvalidOid> {
        let mut subidentifiers = Vec::new();
        let mut current: u64 = 0;
        let mut pending = false;
        for byte in content {
            if !pending && *byte == 0x80 {
                return Err(InvalidOid::Der("non-minimal subidentifier"));
            }
            current = current
                .checked_mul(128)
                .and_then(|c| c.checked_add(u64::from(byte & 0x7f)))
                .filter(|c| *c <= u64::from(u32::MAX) + 80)
                .ok_or(InvalidOid::Der("subidentifier too large"))?;
            pending = byte & 0x80 != 0;
            if !pending {
                subidentifiers.push(current);
                current = 0;
            }
        }
        if pending {
            return Err(InvalidOid::Der("truncated subidentifier"));
        }
        let Some((&first, rest)) = subidentifiers.split_first() else {
            return Err(InvalidOid::Der("empty object identifier"));
        };
        let (a, b) = match first {
            0..40 => (0, first),
            40..80 => (1, first - 40),
            _ => (2, first - 80),
        };
        let mut arcs = Vec::with_capacity(subidentifiers.len() + 1);
        arcs.push(a as u32);
        arcs.push(u32::try_from(b).map_err(|_| InvalidOid::Der("subidentifier too large"))?);
        for arc in rest {
            arcs.push(u32::try_from(*arc).map_err(|_| InvalidOid::Der("subidentifier too large"))?);
        }
        Self::from_arcs(arcs)
    }
}

fn push_base128(out: &mut Vec<u8>, value: u64) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    let mut rest = value;
    loop {
        groups[n] = (rest & 0x7f) as u8;
        n += 1;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        out.push(groups[i] | continuation);
    }
}

fn validate(arcs: &[u32]) -> Result<(), InvalidOid> {
    match arcs {
        [] | [_] => Err(InvalidOid::TooShort),
        [first, ..] if *first > 2 => Err(InvalidOid::FirstArc(*first)),
        [first, second, ..] if *first < 2 && *second >= 40 => Err(InvalidOid::SecondArc(*second)),
        _ => Ok(()),
    }
}

impl Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut arcs = self.0.iter();
        if let Some(first) = arcs.next() {
            write!(f, "{first}")?;
        }
        for arc in arcs {
            write!(f, ".{arc}")?;
        }
        Ok(())
    }
}

impl FromStr for Oid {
    type Err = InvalidOid;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arcs = s
            .split('.')
            .map(|arc| arc.parse::<u32>().map_err(|_| InvalidOid::Text(s.to_owned())))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_arcs(arcs)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidOid {
    #[error("object identifier needs at least two arcs")]
    TooShort,
    #[error("first arc must be 0, 1 or 2, got {0}")]
    FirstArc(u32),
    #[error("second arc must be below 40, got {0}")]
    SecondArc(u32),
    #[error("not a dotted object identifier: {0:?}")]
    Text(String),
    #[error("malformed DER object identifier: {0}")]
    Der(&'static str),
}
