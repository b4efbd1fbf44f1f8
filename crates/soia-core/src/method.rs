//! RPC 方法描述符：生成的服务绑定所持有的最小元数据。

use crate::serializer::Serializer;

/// 一个 RPC 方法的描述：名字、永久编号与请求 / 响应两侧的序列化器。
///
/// 编解码核心不驱动任何传输；本类型只是生成代码与外层传输层之间的
/// 约定载体。
pub struct Method<Request, Response> {
    name: &'static str,
    number: i32,
    request_serializer: Serializer<Request>,
    response_serializer: Serializer<Response>,
}

impl<Request, Response> Method<Request, Response> {
    /// 构造方法描述符。
    pub fn new(
        name: &'static str,
        number: i32,
        request_serializer: Serializer<Request>,
        response_serializer: Serializer<Response>,
    ) -> Self {
        Self {
            name,
            number,
            request_serializer,
            response_serializer,
        }
    }

    /// 方法名。
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 方法编号。
    pub fn number(&self) -> i32 {
        self.number
    }

    /// 请求序列化器。
    pub fn request_serializer(&self) -> &Serializer<Request> {
        &self.request_serializer
    }

    /// 响应序列化器。
    pub fn response_serializer(&self) -> &Serializer<Response> {
        &self.response_serializer
    }
}
