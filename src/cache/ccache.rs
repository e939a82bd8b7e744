//! MIT credential cache, file format version 4.
//!
//! All integers are big endian. Counted strings and octet strings share one layout, a `u32` length
//! followed by the bytes.
use binrw::{BinWrite, binrw};

use super::{
    CacheError,
    time::{CacheTime, DECOY_LIFETIME},
};
use crate::der;

/// `KRB5_NT_PRINCIPAL`
pub const NT_PRINCIPAL: u32 = 1;
/// `KRB5_NT_SRV_INST`
pub const NT_SRV_INST: u32 = 2;
/// aes128-cts-hmac-sha1-96
pub const ETYPE_AES128_CTS_HMAC_SHA1_96: u16 = 17;
const KRB5_PVNO: i64 = 5;

#[binrw]
#[brw(big, magic = 0x0504u16)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheFile {
    #[bw(calc = header.len() as u16)]
    #[br(temp)]
    header_len: u16,
    #[br(count = header_len)]
    pub header: Vec<u8>,
    pub default_principal: Principal,
    #[br(parse_with = binrw::helpers::until_eof)]
    pub credentials: Vec<Credential>,
}
impl CacheFile {
    pub fn to_bytes(&self) -> Result<Vec<u8>, binrw::Error> {
        let mut writer = binrw::io::Cursor::new(Vec::new());
        self.write(&mut writer)?;
        Ok(writer.into_inner())
    }
}

#[binrw]
#[brw(big)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Data {
    #[bw(calc = value.len() as u32)]
    #[br(temp)]
    len: u32,
    #[br(count = len)]
    pub value: Vec<u8>,
}
impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Self {
            value: value.as_bytes().to_vec(),
        }
    }
}
impl From<Vec<u8>> for Data {
    fn from(value: Vec<u8>) -> Self {
        Self { value }
    }
}

#[binrw]
#[brw(big)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub name_type: u32,
    #[bw(calc = components.len() as u32)]
    #[br(temp)]
    component_count: u32,
    pub realm: Data,
    #[br(count = component_count)]
    pub components: Vec<Data>,
}
impl Principal {
    pub fn new(name_type: u32, realm: &str, components: &[&str]) -> Self {
        Self {
            name_type,
            realm: realm.into(),
            components: components.iter().map(|&c| c.into()).collect(),
        }
    }
}

#[binrw]
#[brw(big)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBlock {
    pub enctype: u16,
    pub data: Data,
}

#[binrw]
#[brw(big)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Times {
    pub authtime: u32,
    pub starttime: u32,
    pub endtime: u32,
    pub renew_till: u32,
}

/// An address or an authorization data element
#[binrw]
#[brw(big)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedData {
    pub tag: u16,
    pub data: Data,
}

#[binrw]
#[brw(big)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub client: Principal,
    pub server: Principal,
    pub key: KeyBlock,
    pub times: Times,
    pub is_skey: u8,
    pub ticket_flags: u32,
    #[bw(calc = addresses.len() as u32)]
    #[br(temp)]
    address_count: u32,
    #[br(count = address_count)]
    pub addresses: Vec<TaggedData>,
    #[bw(calc = authdata.len() as u32)]
    #[br(temp)]
    authdata_count: u32,
    #[br(count = authdata_count)]
    pub authdata: Vec<TaggedData>,
    pub ticket: Data,
    pub second_ticket: Data,
}

/// A cache holding a single `krbtgt/realm` ticket for `user@realm` that decrypts to nothing.
///
/// The ticket claims [`DECOY_LIFETIME`] of validity from `now`.
pub fn decoy(user: &str, realm: &str, now: CacheTime) -> Result<CacheFile, CacheError> {
    let end = now.checked_add(DECOY_LIFETIME)?;
    let client = Principal::new(NT_PRINCIPAL, realm, &[user]);
    let server = Principal::new(NT_SRV_INST, realm, &["krbtgt", realm]);
    let credential = Credential {
        ticket: decoy_ticket(&server).into(),
        client: client.clone(),
        server,
        key: KeyBlock {
            enctype: ETYPE_AES128_CTS_HMAC_SHA1_96,
            data: Vec::new().into(),
        },
        times: Times {
            authtime: now.as_secs(),
            starttime: now.as_secs(),
            endtime: end.as_secs(),
            renew_till: end.as_secs(),
        },
        is_skey: 0,
        ticket_flags: 0,
        addresses: Vec::new(),
        authdata: Vec::new(),
        second_ticket: Vec::new().into(),
    };
    Ok(CacheFile {
        header: Vec::new(),
        default_principal: client,
        credentials: vec![credential],
    })
}

/// `Ticket` (RFC 4120, section 5.3) for `server` with an empty cipher text
fn decoy_ticket(server: &Principal) -> Vec<u8> {
    let components: Vec<Vec<u8>> = server
        .components
        .iter()
        .map(|c| der::general_string(&String::from_utf8_lossy(&c.value)))
        .collect();
    let principal_name = der::sequence(&[
        der::context(0, der::integer(i64::from(server.name_type))),
        der::context(1, der::sequence(&components)),
    ]);
    let enc_part = der::sequence(&[
        der::context(0, der::integer(i64::from(ETYPE_AES128_CTS_HMAC_SHA1_96))),
        der::context(2, der::octet_string(&[])),
    ]);
    der::application(
        1,
        der::sequence(&[
            der::context(0, der::integer(KRB5_PVNO)),
            der::context(1, der::general_string(&String::from_utf8_lossy(&server.realm.value))),
            der::context(2, principal_name),
            der::context(3, enc_part),
        ]),
    )
}
