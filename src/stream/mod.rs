//! 流描述
//!
//! 一条流量流的内存描述：帧长、包数、有序协议层及每层绑定的可变字段。

mod layer;
mod spec;

pub use layer::{
    ETHER_TYPE_IP4, ETHER_TYPE_IP6, ETHER_TYPE_VLAN, FCS_LEN, IP_PROTO_UDP, LayerTag, NamedField,
    Protocol,
};
pub use spec::{FieldBinding, Layer, LayerOffsets, StreamBuilder, StreamError, StreamSpec};
